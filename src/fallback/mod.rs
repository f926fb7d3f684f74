// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Developer-bundled fallback paywalls.
//!
//! The app ships a copy of the backend's paywall-list response and installs
//! it once at startup. The resulting [`FallbackSnapshot`] is immutable and is
//! only consulted when the cache has nothing newer (see [`crate::resolver`]).
//!
//! # Payload
//!
//! ```text
//! {
//!   "data": [ { "developer_id": "...", "paywall_updated_at": 17..., ... } ],
//!   "meta": { "products": [ { "vendor_product_id": "...", "timestamp": 17... } ] }
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use paywall_sync::FallbackStore;
//!
//! let store = FallbackStore::new();
//! let payload = br#"{"data": [], "meta": {"products": []}}"#;
//! store.install(payload).expect("valid payload");
//! assert!(store.snapshot().is_some());
//!
//! // A broken payload is rejected and the previous snapshot stays active
//! assert!(store.install(b"not json").is_err());
//! assert!(store.snapshot().is_some());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::entities::{BackendProduct, Paywall, Versioned, VersionedEntity};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct FallbackPayload {
    data: Vec<Paywall>,
    #[serde(default)]
    meta: FallbackMeta,
}

#[derive(Deserialize, Default)]
struct FallbackMeta {
    #[serde(default)]
    products: Vec<BackendProduct>,
}

/// Immutable parse of one fallback payload.
#[derive(Debug, Clone, Default)]
pub struct FallbackSnapshot {
    paywalls: HashMap<String, VersionedEntity<Paywall>>,
    products: HashMap<String, VersionedEntity<BackendProduct>>,
    product_vendor_ids: HashSet<String>,
}

impl FallbackSnapshot {
    /// Parse a payload. Nothing is produced unless the whole payload decodes.
    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        let payload: FallbackPayload = serde_json::from_slice(raw)?;
        Ok(Self::from_payload(payload))
    }

    fn from_payload(payload: FallbackPayload) -> Self {
        let mut snapshot = Self::default();

        for paywall in payload.data {
            for reference in &paywall.products {
                snapshot
                    .product_vendor_ids
                    .insert(reference.vendor_product_id.clone());
            }
            keep_newest(&mut snapshot.paywalls, paywall);
        }
        for product in payload.meta.products {
            snapshot
                .product_vendor_ids
                .insert(product.vendor_product_id.clone());
            keep_newest(&mut snapshot.products, product);
        }

        snapshot
    }

    #[must_use]
    pub fn paywall(&self, id: &str) -> Option<&VersionedEntity<Paywall>> {
        self.paywalls.get(id)
    }

    #[must_use]
    pub fn product(&self, id: &str) -> Option<&VersionedEntity<BackendProduct>> {
        self.products.get(id)
    }

    #[must_use]
    pub fn product_vendor_ids(&self) -> &HashSet<String> {
        &self.product_vendor_ids
    }

    #[must_use]
    pub fn paywall_count(&self) -> usize {
        self.paywalls.len()
    }

    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

// Duplicate keys inside one payload: higher version wins, first seen on a tie.
fn keep_newest<T: Versioned>(map: &mut HashMap<String, VersionedEntity<T>>, value: T) {
    let entity = VersionedEntity::from_entity(value);
    let key = entity.value.key().to_string();
    match map.get(&key) {
        Some(existing) if existing.version >= entity.version => {}
        _ => {
            map.insert(key, entity);
        }
    }
}

/// Holds the currently installed [`FallbackSnapshot`], if any.
///
/// Readers get an `Arc` to the snapshot and never block an install for
/// longer than a pointer swap.
#[derive(Default)]
pub struct FallbackStore {
    current: RwLock<Option<Arc<FallbackSnapshot>>>,
}

impl FallbackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `raw` and, only if it decodes completely, replace the active snapshot.
    ///
    /// On failure the previously installed snapshot (if any) stays in effect.
    pub fn install(&self, raw: &[u8]) -> Result<(), DecodeError> {
        match FallbackSnapshot::parse(raw) {
            Ok(snapshot) => {
                info!(
                    paywalls = snapshot.paywall_count(),
                    products = snapshot.product_count(),
                    vendor_ids = snapshot.product_vendor_ids().len(),
                    "Fallback paywalls installed"
                );
                *self.current.write() = Some(Arc::new(snapshot));
                crate::metrics::record_fallback_install("success");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Rejected fallback paywalls payload");
                crate::metrics::record_fallback_install("error");
                Err(e)
            }
        }
    }

    /// The active snapshot, frozen at call time.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<FallbackSnapshot>> {
        self.current.read().clone()
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.current.read().is_some()
    }
}
