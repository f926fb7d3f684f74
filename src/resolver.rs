// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fallback-aware lookups over the backend cache and the fallback snapshot.
//!
//! For paywalls and products the rule is the same:
//!
//! ```text
//! cache miss            → fallback (may be absent)
//! cache hit, no fallback → cache
//! both                   → cache if cache.version >= fallback.version, else fallback
//! ```
//!
//! Product vendor ids are not versioned records: the result is the union of
//! both sources.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use paywall_sync::{BackendCache, FallbackResolver, FallbackStore};
//!
//! let cache = Arc::new(BackendCache::new());
//! let fallback = Arc::new(FallbackStore::new());
//! let resolver = FallbackResolver::new(cache, fallback);
//!
//! // Nothing anywhere is not an error
//! assert!(resolver.resolve_paywall("missing").is_none());
//! assert!(resolver.all_product_vendor_ids().is_empty());
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::BackendCache;
use crate::entities::{BackendProduct, Paywall, VersionedEntity};
use crate::fallback::{FallbackSnapshot, FallbackStore};

/// Which layer a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Fallback,
}

impl Source {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Fallback => "fallback",
        }
    }
}

/// Pick between a cached and a fallback copy of the same entity.
///
/// The cache wins ties: the fallback is only preferred when its version is
/// strictly greater.
pub fn prefer_newer<T>(
    cache: Option<VersionedEntity<T>>,
    fallback: Option<VersionedEntity<T>>,
) -> Option<(VersionedEntity<T>, Source)> {
    match (cache, fallback) {
        (None, None) => None,
        (None, Some(fallback)) => Some((fallback, Source::Fallback)),
        (Some(cache), None) => Some((cache, Source::Cache)),
        (Some(cache), Some(fallback)) => {
            if fallback.version > cache.version {
                Some((fallback, Source::Fallback))
            } else {
                Some((cache, Source::Cache))
            }
        }
    }
}

/// Read-only query layer over a [`BackendCache`] and a [`FallbackStore`].
///
/// Every call reads the fallback snapshot once, so a concurrent install
/// never produces a half-old, half-new answer within one call.
#[derive(Clone)]
pub struct FallbackResolver {
    cache: Arc<BackendCache>,
    fallback: Arc<FallbackStore>,
}

impl FallbackResolver {
    pub fn new(cache: Arc<BackendCache>, fallback: Arc<FallbackStore>) -> Self {
        Self { cache, fallback }
    }

    #[must_use]
    pub fn resolve_paywall(&self, id: &str) -> Option<VersionedEntity<Paywall>> {
        let fallback = self
            .fallback
            .snapshot()
            .and_then(|snapshot| snapshot.paywall(id).cloned());
        let resolved = prefer_newer(self.cache.paywalls.get(id), fallback);
        record("paywall", resolved.as_ref().map(|(_, source)| *source));
        resolved.map(|(entity, _)| entity)
    }

    #[must_use]
    pub fn resolve_product(&self, id: &str) -> Option<VersionedEntity<BackendProduct>> {
        let snapshot = self.fallback.snapshot();
        self.product_against(snapshot.as_deref(), id)
    }

    /// Resolve each id in order, dropping ids neither source knows.
    #[must_use]
    pub fn resolve_products(&self, ids: &[&str]) -> Vec<VersionedEntity<BackendProduct>> {
        let snapshot = self.fallback.snapshot();
        ids.iter()
            .filter_map(|id| self.product_against(snapshot.as_deref(), id))
            .collect()
    }

    /// Union of cached and fallback product vendor ids.
    #[must_use]
    pub fn all_product_vendor_ids(&self) -> HashSet<String> {
        let mut ids = self.cache.vendor_ids.all();
        if let Some(snapshot) = self.fallback.snapshot() {
            ids.extend(snapshot.product_vendor_ids().iter().cloned());
        }
        ids
    }

    fn product_against(
        &self,
        snapshot: Option<&FallbackSnapshot>,
        id: &str,
    ) -> Option<VersionedEntity<BackendProduct>> {
        let fallback = snapshot.and_then(|s| s.product(id).cloned());
        let resolved = prefer_newer(self.cache.products.get(id), fallback);
        record("product", resolved.as_ref().map(|(_, source)| *source));
        resolved.map(|(entity, _)| entity)
    }
}

fn record(entity: &str, source: Option<Source>) {
    crate::metrics::record_resolution(entity, source.map_or("none", Source::as_str));
}
