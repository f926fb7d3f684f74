// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query, store and tracking API of the client.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::analytics::{AnalyticsError, EventType};
use crate::entities::{BackendProduct, Paywall, PaywallConfiguration};
use crate::fallback::DecodeError;
use crate::paywall_config::PaywallConfigurationRequest;

use super::PaywallClient;

impl PaywallClient {
    // ═══════════════════════════════════════════════════════════════════════════
    // Fallback & resolution
    // ═══════════════════════════════════════════════════════════════════════════

    /// Install the developer's bundled fallback payload.
    ///
    /// A payload that fails to decode is rejected whole; the previous
    /// fallback (if any) stays active.
    pub fn set_fallback_paywalls(&self, raw: &[u8]) -> Result<(), DecodeError> {
        self.fallback.install(raw)
    }

    /// Best known paywall for `developer_id`: cached, unless the fallback is newer.
    #[must_use]
    pub fn paywall(&self, developer_id: &str) -> Option<Paywall> {
        self.resolver
            .resolve_paywall(developer_id)
            .map(|entity| entity.into_value())
    }

    #[must_use]
    pub fn product(&self, vendor_product_id: &str) -> Option<BackendProduct> {
        self.resolver
            .resolve_product(vendor_product_id)
            .map(|entity| entity.into_value())
    }

    /// Resolve each id in order; ids nobody knows are skipped.
    #[must_use]
    pub fn products(&self, vendor_product_ids: &[&str]) -> Vec<BackendProduct> {
        self.resolver
            .resolve_products(vendor_product_ids)
            .into_iter()
            .map(|entity| entity.into_value())
            .collect()
    }

    #[must_use]
    pub fn all_product_vendor_ids(&self) -> HashSet<String> {
        self.resolver.all_product_vendor_ids()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Backend responses
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn store_paywall(&self, paywall: Paywall) {
        self.cache.store_paywall(paywall);
    }

    pub fn store_products(&self, products: impl IntoIterator<Item = BackendProduct>) {
        self.cache.store_products(products);
    }

    pub fn store_product_vendor_ids(&self, ids: HashSet<String>, hash: Option<String>) {
        self.cache.store_product_vendor_ids(ids, hash);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Paywall configuration
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fetch request for a variation, carrying the identity's locale and the
    /// response hash of the configuration we already hold.
    #[must_use]
    pub fn paywall_configuration_request(&self, variation_id: &str) -> PaywallConfigurationRequest {
        self.configurations
            .request_for(variation_id, self.identity.locale())
    }

    /// Decode the HTTP layer's answer to `request` and fold it into the cache.
    ///
    /// Returns the configuration now in effect for the variation.
    pub fn apply_paywall_configuration(
        &self,
        request: &PaywallConfigurationRequest,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Option<PaywallConfiguration>, DecodeError> {
        let response = request.decode_response(headers, body)?;
        Ok(self.configurations.apply(&request.variation_id, response))
    }

    #[must_use]
    pub fn paywall_configuration(&self, variation_id: &str) -> Option<PaywallConfiguration> {
        self.configurations.get(variation_id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Analytics
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record an event and wait for its completion.
    pub async fn track(
        &self,
        event_type: EventType,
        params: HashMap<String, String>,
    ) -> Result<(), AnalyticsError> {
        let handle = self.analytics.record(event_type, params)?;
        handle
            .await
            .map_err(|e| AnalyticsError::Background(e.to_string()))?
    }

    /// Send pending events now. Returns how many were delivered.
    pub async fn sync_events(&self) -> Result<usize, AnalyticsError> {
        let sent = self.analytics.sync().await?;
        debug!(sent, "Manual analytics sync finished");
        Ok(sent)
    }
}
