// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache of backend-fetched entities.
//!
//! [`BackendCache`] groups the three caches the resolver reads:
//! paywalls by developer id, products by vendor product id, and the
//! backend's set of all product vendor ids. Persistence across restarts
//! goes through a host-provided [`KeyValueStore`].

mod versioned;

pub use versioned::VersionedCache;

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::debug;

use crate::entities::{BackendProduct, Paywall, ValueWithHash};
use crate::storage::{get_json, put_json, KeyValueStore, StorageError};

const PAYWALLS_KEY: &str = "cached_paywalls";
const PRODUCTS_KEY: &str = "cached_products";
const VENDOR_IDS_KEY: &str = "cached_product_vendor_ids";

/// The backend's list of known product vendor ids, with its response hash.
///
/// Replaced wholesale on every refresh.
#[derive(Default)]
pub struct VendorIdCache {
    inner: RwLock<Option<ValueWithHash<HashSet<String>>>>,
}

impl VendorIdCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ids: HashSet<String>, hash: Option<String>) {
        *self.inner.write() = Some(ValueWithHash::new(ids, hash));
    }

    /// All cached vendor ids (empty when nothing was fetched yet).
    #[must_use]
    pub fn all(&self) -> HashSet<String> {
        self.inner
            .read()
            .as_ref()
            .map(|vh| vh.value.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn hash(&self) -> Option<String> {
        self.inner.read().as_ref().and_then(|vh| vh.hash.clone())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.read().is_some()
    }
}

/// Backend-fetched paywalls, products and product vendor ids.
#[derive(Default)]
pub struct BackendCache {
    pub paywalls: VersionedCache<Paywall>,
    pub products: VersionedCache<BackendProduct>,
    pub vendor_ids: VendorIdCache,
}

impl BackendCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_paywall(&self, paywall: Paywall) {
        debug!(id = %paywall.developer_id, version = paywall.updated_at, "Caching paywall");
        self.paywalls.put_entity(paywall);
    }

    pub fn store_products(&self, products: impl IntoIterator<Item = BackendProduct>) {
        for product in products {
            self.products.put_entity(product);
        }
    }

    pub fn store_product_vendor_ids(&self, ids: HashSet<String>, hash: Option<String>) {
        debug!(count = ids.len(), "Caching product vendor ids");
        self.vendor_ids.set(ids, hash);
    }

    /// Write all three caches to `store`.
    pub fn persist(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        self.paywalls.save_to(store, PAYWALLS_KEY)?;
        self.products.save_to(store, PRODUCTS_KEY)?;
        if let Some(vh) = self.vendor_ids.inner.read().as_ref() {
            put_json(store, VENDOR_IDS_KEY, vh)?;
        }
        Ok(())
    }

    /// Reload caches written by [`Self::persist`].
    ///
    /// Every entry is decoded before anything is applied, so a corrupt
    /// entry fails the whole restore and leaves the cache untouched.
    pub fn restore(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        let paywalls = VersionedCache::<Paywall>::read_from(store, PAYWALLS_KEY)?;
        let products = VersionedCache::<BackendProduct>::read_from(store, PRODUCTS_KEY)?;
        let vendor_ids: Option<ValueWithHash<HashSet<String>>> = get_json(store, VENDOR_IDS_KEY)?;

        if let Some(paywalls) = paywalls {
            self.paywalls.replace_all(paywalls);
        }
        if let Some(products) = products {
            self.products.replace_all(products);
        }
        if let Some(vh) = vendor_ids {
            *self.vendor_ids.inner.write() = Some(vh);
        }
        debug!(
            paywalls = self.paywalls.len(),
            products = self.products.len(),
            "Backend cache restored"
        );
        Ok(())
    }
}
