//! # Paywall Sync
//!
//! Portable core of an in-app purchase SDK: fallback-aware paywall and product
//! caching, and signed delivery of analytics event batches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PaywallClient                         │
//! │  • One explicitly constructed instance per SdkConfig       │
//! │  • Host supplies identity, transport and persistence       │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                       │
//!          ▼                                       ▼
//! ┌───────────────────────────────┐   ┌───────────────────────────────┐
//! │       FallbackResolver        │   │     Analytics (sync driver)   │
//! │  • cache wins version ties    │   │  • EventBuffer (unique ids)   │
//! │  • vendor ids: set union      │   │  • PutRecords batch body      │
//! └───────────────────────────────┘   └───────────────────────────────┘
//!      │                   │                          │
//!      ▼                   ▼                          ▼
//! ┌──────────────┐  ┌──────────────┐      ┌───────────────────────────┐
//! │ BackendCache │  │FallbackStore │      │      RequestSigner        │
//! │  DashMap,    │  │ immutable    │      │  AWS Signature V4         │
//! │  last write  │  │ snapshot,    │      │  (canonical request,      │
//! │  wins        │  │ atomic swap  │      │   HMAC key chain)         │
//! └──────────────┘  └──────────────┘      └───────────────────────────┘
//!                                                     │
//!                                                     ▼
//!                                           EventTransport (host HTTP)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use paywall_sync::{
//!     EventTransport, EventType, HttpRequest, Installation, PaywallClient, SdkConfig,
//!     StaticIdentity, TransmissionError,
//! };
//!
//! struct Http;
//!
//! #[async_trait]
//! impl EventTransport for Http {
//!     async fn send(&self, _request: HttpRequest) -> Result<(), TransmissionError> {
//!         // hand the request to the platform HTTP client
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let identity = Arc::new(StaticIdentity::new("profile-id", "iOS").with_installation(
//!         Installation {
//!             profile_installation_meta_id: "meta-id".into(),
//!             iam_secret_key: "secret".into(),
//!             iam_access_key_id: "access-key".into(),
//!             iam_session_token: "session-token".into(),
//!         },
//!     ));
//!     let client = PaywallClient::new(SdkConfig::default(), identity, Arc::new(Http));
//!
//!     // Offline safety net, shipped inside the app
//!     let bundled = std::fs::read("fallback_paywalls.json").expect("bundled fallback");
//!     client
//!         .set_fallback_paywalls(&bundled)
//!         .expect("bundled fallback decodes");
//!
//!     if let Some(paywall) = client.paywall("onboarding") {
//!         println!("Showing {}", paywall.name);
//!         client
//!             .track(EventType::PaywallShowed, HashMap::new())
//!             .await
//!             .ok();
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`]: The [`PaywallClient`] facade
//! - [`cache`]: Versioned backend cache
//! - [`fallback`]: Bundled fallback snapshot
//! - [`resolver`]: Cache/fallback arbitration
//! - [`signing`]: AWS Signature V4 request signing
//! - [`analytics`]: Event buffer and sync driver
//! - [`paywall_config`]: Paywall builder configuration fetch
//! - [`storage`]: Host persistence seam

pub mod analytics;
pub mod cache;
pub mod client;
pub mod config;
pub mod entities;
pub mod fallback;
pub mod metrics;
pub mod paywall_config;
pub mod resolver;
pub mod signing;
pub mod storage;

pub use analytics::{
    Analytics, AnalyticsError, EventBuffer, EventRecord, EventTransport, EventType,
    IdentityProvider, Installation, StaticIdentity, SyncState, TransmissionError,
};
pub use cache::{BackendCache, VendorIdCache, VersionedCache};
pub use client::PaywallClient;
pub use config::SdkConfig;
pub use entities::{
    BackendProduct, OfferEligibility, Paywall, PaywallConfiguration, ProductReference,
    ValueWithHash, Versioned, VersionedEntity,
};
pub use fallback::{DecodeError, FallbackSnapshot, FallbackStore};
pub use metrics::LatencyTimer;
pub use paywall_config::{ConfigurationCache, PaywallConfigurationRequest};
pub use resolver::{prefer_newer, FallbackResolver, Source};
pub use signing::{AmzDate, CanonicalRequest, HttpRequest, RequestSigner, SigningCredential, SigningError};
pub use storage::{InMemoryStore, KeyValueStore, StorageError};
