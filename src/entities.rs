// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backend entities and their version wrappers.
//!
//! Paywalls and products arrive from the backend carrying a version
//! (`paywall_updated_at` / `timestamp`). Everything downstream works on
//! [`VersionedEntity`], which pulls that version out so the cache and the
//! resolver can compare copies without knowing the entity type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entities that carry a backend-assigned version.
pub trait Versioned {
    /// Key the entity is cached and resolved under
    fn key(&self) -> &str;
    fn version(&self) -> u64;
}

/// A domain value tagged with its backend version.
///
/// Higher versions supersede lower ones for the same key. The version is
/// assigned by the backend and never changed client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntity<T> {
    pub version: u64,
    pub value: T,
}

impl<T> VersionedEntity<T> {
    pub fn new(value: T, version: u64) -> Self {
        Self { version, value }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Versioned> VersionedEntity<T> {
    /// Wrap an entity using its own embedded version.
    pub fn from_entity(value: T) -> Self {
        let version = value.version();
        Self { version, value }
    }
}

/// A backend value together with the response hash it was served with.
///
/// `value` is `None` when the backend answered "unchanged" for a known hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueWithHash<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl<T> ValueWithHash<T> {
    pub fn new(value: T, hash: Option<String>) -> Self {
        Self { value, hash }
    }
}

/// A product as referenced from a paywall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReference {
    pub vendor_product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotional_offer_id: Option<String>,
}

/// A named, versioned bundle of product references and presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paywall {
    /// Identifier the app uses to request this paywall
    pub developer_id: String,
    pub variation_id: String,
    pub name: String,
    #[serde(default)]
    pub ab_test_name: String,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub products: Vec<ProductReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_config: Option<Value>,
    /// Backend version (epoch millis of the last paywall update)
    #[serde(rename = "paywall_updated_at")]
    pub updated_at: u64,
}

impl Versioned for Paywall {
    fn key(&self) -> &str {
        &self.developer_id
    }

    fn version(&self) -> u64 {
        self.updated_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferEligibility {
    #[default]
    Unknown,
    Eligible,
    Ineligible,
}

/// Backend-side product record (store metadata lives on the device, not here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProduct {
    pub vendor_product_id: String,
    #[serde(default)]
    pub introductory_offer_eligibility: OfferEligibility,
    #[serde(default)]
    pub promotional_offer_eligibility: bool,
    /// Backend version
    pub timestamp: u64,
}

impl Versioned for BackendProduct {
    fn key(&self) -> &str {
        &self.vendor_product_id
    }

    fn version(&self) -> u64 {
        self.timestamp
    }
}

/// Builder configuration of a paywall variation, fetched by variation id.
///
/// Rendering is out of scope, so the layout tree is kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaywallConfiguration {
    pub id: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub styles: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paywall_version_from_updated_at() {
        let paywall: Paywall = serde_json::from_value(json!({
            "developer_id": "onboarding",
            "variation_id": "var-1",
            "name": "Onboarding",
            "paywall_updated_at": 1700000000123u64,
        }))
        .unwrap();

        let entity = VersionedEntity::from_entity(paywall);
        assert_eq!(entity.version, 1700000000123);
        assert_eq!(entity.value.key(), "onboarding");
        assert!(entity.value.products.is_empty());
        assert_eq!(entity.value.revision, 0);
    }

    #[test]
    fn test_product_defaults() {
        let product: BackendProduct = serde_json::from_value(json!({
            "vendor_product_id": "weekly.premium",
            "timestamp": 7,
        }))
        .unwrap();

        assert_eq!(product.introductory_offer_eligibility, OfferEligibility::Unknown);
        assert!(!product.promotional_offer_eligibility);
        assert_eq!(product.version(), 7);
    }

    #[test]
    fn test_eligibility_wire_names() {
        let value = serde_json::to_value(OfferEligibility::Ineligible).unwrap();
        assert_eq!(value, json!("ineligible"));
    }

    #[test]
    fn test_value_with_hash_skips_missing_hash() {
        let vh = ValueWithHash::new(vec!["a".to_string()], None);
        let json_str = serde_json::to_string(&vh).unwrap();
        assert!(!json_str.contains("hash"));
    }
}
