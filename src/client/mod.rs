// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Paywall client facade.
//!
//! The [`PaywallClient`] owns one instance of every component, built from a
//! single [`SdkConfig`]:
//! - backend cache (paywalls, products, product vendor ids)
//! - fallback store, installed from the developer's bundled payload
//! - fallback-aware resolver over both
//! - analytics buffer and sync driver
//! - paywall configuration cache
//!
//! Nothing is process-global: two clients never share state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use paywall_sync::{
//!     EventTransport, HttpRequest, PaywallClient, SdkConfig, StaticIdentity, TransmissionError,
//! };
//!
//! struct Http;
//!
//! #[async_trait]
//! impl EventTransport for Http {
//!     async fn send(&self, _request: HttpRequest) -> Result<(), TransmissionError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let identity = Arc::new(StaticIdentity::new("profile-id", "iOS"));
//! let client = PaywallClient::new(SdkConfig::default(), identity, Arc::new(Http));
//!
//! client
//!     .set_fallback_paywalls(br#"{"data": [], "meta": {"products": []}}"#)
//!     .expect("bundled payload");
//! let sync_loop = client.spawn_sync_loop();
//!
//! // ...
//!
//! client.shutdown();
//! sync_loop.await.expect("sync loop");
//! # }
//! ```

mod api;
mod lifecycle;

use std::sync::Arc;

use tokio::sync::watch;

use crate::analytics::{Analytics, EventBuffer, EventTransport, IdentityProvider};
use crate::cache::BackendCache;
use crate::config::SdkConfig;
use crate::fallback::FallbackStore;
use crate::paywall_config::ConfigurationCache;
use crate::resolver::FallbackResolver;
use crate::storage::{KeyValueStore, StorageError};

/// Entry point of the SDK core.
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct PaywallClient {
    pub(super) config: SdkConfig,
    pub(super) identity: Arc<dyn IdentityProvider>,
    pub(super) cache: Arc<BackendCache>,
    pub(super) fallback: Arc<FallbackStore>,
    pub(super) resolver: FallbackResolver,
    pub(super) analytics: Arc<Analytics>,
    pub(super) configurations: ConfigurationCache,
    /// Host persistence (absent: everything stays in memory)
    pub(super) store: Option<Arc<dyn KeyValueStore>>,
    pub(super) shutdown: watch::Sender<bool>,
}

impl PaywallClient {
    /// Client with in-memory state only.
    pub fn new(
        config: SdkConfig,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn EventTransport>,
    ) -> Self {
        Self::build(config, identity, transport, EventBuffer::new(), None)
    }

    /// Client backed by host persistence.
    ///
    /// Pending analytics events and cached backend entities written by a
    /// previous process are reloaded before the client is returned.
    pub fn with_store(
        config: SdkConfig,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn EventTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, StorageError> {
        let buffer = EventBuffer::with_store(store.clone())?;
        let client = Self::build(config, identity, transport, buffer, Some(store));
        client.restore()?;
        Ok(client)
    }

    fn build(
        config: SdkConfig,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn EventTransport>,
        buffer: EventBuffer,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let cache = Arc::new(BackendCache::new());
        let fallback = Arc::new(FallbackStore::new());
        let resolver = FallbackResolver::new(cache.clone(), fallback.clone());
        let analytics = Arc::new(Analytics::new(&config, identity.clone(), transport, buffer));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            identity,
            cache,
            fallback,
            resolver,
            analytics,
            configurations: ConfigurationCache::new(),
            store,
            shutdown,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &BackendCache {
        &self.cache
    }

    #[must_use]
    pub fn fallback(&self) -> &FallbackStore {
        &self.fallback
    }

    #[must_use]
    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    #[must_use]
    pub fn analytics(&self) -> &Arc<Analytics> {
        &self.analytics
    }
}
