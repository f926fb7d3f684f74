// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Paywall builder configuration fetch with response-hash revalidation.
//!
//! The client sends the hash of the last response it holds for a variation.
//! When the backend answers with the same hash the body is not decoded and
//! the cached configuration stays in use.
//!
//! ```text
//! GET {base}/sdk/in-apps/paywall-builder/{variation_id}/?locale=..
//!     x-previous-response-hash: <hash we hold>
//!
//! response x-response-hash == sent hash  → unchanged (value: None)
//! otherwise                              → {"data": PaywallConfiguration}
//! ```

use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use crate::entities::{PaywallConfiguration, ValueWithHash};
use crate::fallback::DecodeError;
use crate::signing::HttpRequest;

pub const HEADER_PREVIOUS_RESPONSE_HASH: &str = "x-previous-response-hash";
pub const HEADER_RESPONSE_HASH: &str = "x-response-hash";

#[derive(Deserialize)]
struct ResponseBody {
    data: PaywallConfiguration,
}

/// One configuration fetch for a paywall variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaywallConfigurationRequest {
    pub variation_id: String,
    pub locale: Option<String>,
    pub response_hash: Option<String>,
}

impl PaywallConfigurationRequest {
    pub fn new(variation_id: impl Into<String>) -> Self {
        Self {
            variation_id: variation_id.into(),
            locale: None,
            response_hash: None,
        }
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn with_response_hash(mut self, hash: Option<String>) -> Self {
        self.response_hash = hash;
        self
    }

    /// The GET request to hand to the HTTP layer.
    #[must_use]
    pub fn to_http_request(&self, base_url: &str) -> HttpRequest {
        let mut url = format!(
            "{}/sdk/in-apps/paywall-builder/{}/",
            base_url.trim_end_matches('/'),
            self.variation_id
        );
        if let Some(locale) = &self.locale {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("locale", locale)
                .finish();
            url.push('?');
            url.push_str(&query);
        }

        let mut request = HttpRequest::get(url);
        if let Some(hash) = &self.response_hash {
            request.set_header(HEADER_PREVIOUS_RESPONSE_HASH, hash.clone());
        }
        request
    }

    /// Interpret a response to this request.
    pub fn decode_response(
        &self,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<ValueWithHash<Option<PaywallConfiguration>>, DecodeError> {
        let hash = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(HEADER_RESPONSE_HASH))
            .map(|(_, value)| value.clone());

        if hash.is_some() && hash == self.response_hash {
            debug!(variation_id = %self.variation_id, "Paywall configuration unchanged");
            crate::metrics::record_configuration_response("unchanged");
            return Ok(ValueWithHash::new(None, hash));
        }

        let decoded: ResponseBody = serde_json::from_slice(body).map_err(|e| {
            crate::metrics::record_configuration_response("error");
            DecodeError::from(e)
        })?;
        crate::metrics::record_configuration_response("changed");
        Ok(ValueWithHash::new(Some(decoded.data), hash))
    }
}

/// Last fetched configuration per variation, with its response hash.
#[derive(Default)]
pub struct ConfigurationCache {
    entries: DashMap<String, ValueWithHash<PaywallConfiguration>>,
}

impl ConfigurationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, variation_id: &str) -> Option<PaywallConfiguration> {
        self.entries.get(variation_id).map(|e| e.value.clone())
    }

    /// Hash to send with the next fetch of `variation_id`.
    #[must_use]
    pub fn hash_for(&self, variation_id: &str) -> Option<String> {
        self.entries.get(variation_id).and_then(|e| e.hash.clone())
    }

    /// A request for `variation_id` carrying the hash we hold.
    #[must_use]
    pub fn request_for(
        &self,
        variation_id: &str,
        locale: Option<String>,
    ) -> PaywallConfigurationRequest {
        PaywallConfigurationRequest::new(variation_id)
            .with_locale(locale)
            .with_response_hash(self.hash_for(variation_id))
    }

    /// Fold a decoded response in and return the configuration now in effect.
    ///
    /// "Unchanged" keeps the stored value; a new value replaces value and hash.
    pub fn apply(
        &self,
        variation_id: &str,
        response: ValueWithHash<Option<PaywallConfiguration>>,
    ) -> Option<PaywallConfiguration> {
        match response.value {
            Some(configuration) => {
                self.entries.insert(
                    variation_id.to_string(),
                    ValueWithHash::new(configuration.clone(), response.hash),
                );
                Some(configuration)
            }
            None => self.get(variation_id),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
