//! Property-based tests for resolver laws, signing and decoder robustness.
//!
//! Uses proptest to generate random/malformed inputs and verify the crate
//! never panics, only returns clean errors.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};

use paywall_sync::{
    prefer_newer, AmzDate, BackendCache, BackendProduct, CanonicalRequest, EventBuffer,
    EventRecord, FallbackResolver, FallbackStore, HttpRequest, Paywall, PaywallConfigurationRequest,
    RequestSigner, SdkConfig, SigningCredential, Source, VersionedEntity,
};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn paywall(id: &str, version: u64, name: &str) -> Paywall {
    Paywall {
        developer_id: id.to_string(),
        variation_id: format!("{}-var", id),
        name: name.to_string(),
        ab_test_name: String::new(),
        revision: 0,
        products: vec![],
        remote_config: None,
        updated_at: version,
    }
}

fn fallback_payload(paywalls: &[(String, u64)], product_ids: &HashSet<String>) -> Vec<u8> {
    let data: Vec<Value> = paywalls
        .iter()
        .map(|(id, version)| {
            json!({"developer_id": id, "variation_id": "fb", "name": "fallback", "paywall_updated_at": version})
        })
        .collect();
    let products: Vec<Value> = product_ids
        .iter()
        .map(|id| json!({"vendor_product_id": id, "timestamp": 1}))
        .collect();
    serde_json::to_vec(&json!({"data": data, "meta": {"products": products}})).unwrap()
}

fn setup() -> (Arc<BackendCache>, Arc<FallbackStore>, FallbackResolver) {
    let cache = Arc::new(BackendCache::new());
    let fallback = Arc::new(FallbackStore::new());
    let resolver = FallbackResolver::new(cache.clone(), fallback.clone());
    (cache, fallback, resolver)
}

fn id_set_strategy() -> impl Strategy<Value = HashSet<String>> {
    prop::collection::hash_set("[a-z]{1,6}", 0..12)
}

/// Generate arbitrary JSON values (including invalid structures)
fn arbitrary_json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ];

    leaf.prop_recursive(
        4,   // depth
        64,  // max nodes
        10,  // items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..10).prop_map(Value::Array),
                prop::collection::hash_map(".*", inner, 0..10)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

// =============================================================================
// Resolver Laws
// =============================================================================

proptest! {
    /// Cache wins when its version is >= the fallback's, fallback wins otherwise
    #[test]
    fn prop_version_arbitration(v_cache in 0u64..1000, v_fallback in 0u64..1000) {
        let (cache, fallback, resolver) = setup();
        fallback.install(&fallback_payload(&[("k".into(), v_fallback)], &HashSet::new())).unwrap();
        cache.store_paywall(paywall("k", v_cache, "cache"));

        let resolved = resolver.resolve_paywall("k").unwrap();
        if v_cache >= v_fallback {
            prop_assert_eq!(resolved.value.name.as_str(), "cache");
            prop_assert_eq!(resolved.version, v_cache);
        } else {
            prop_assert_eq!(resolved.value.name.as_str(), "fallback");
            prop_assert_eq!(resolved.version, v_fallback);
        }
    }

    /// prefer_newer never invents a value and follows the same rule
    #[test]
    fn prop_prefer_newer_picks_an_input(
        cache in prop::option::of(0u64..50),
        fallback in prop::option::of(0u64..50),
    ) {
        let picked = prefer_newer(
            cache.map(|v| VersionedEntity::new("cache", v)),
            fallback.map(|v| VersionedEntity::new("fallback", v)),
        );
        match (cache, fallback) {
            (None, None) => prop_assert!(picked.is_none()),
            (Some(_), None) => prop_assert_eq!(picked.unwrap().1, Source::Cache),
            (None, Some(_)) => prop_assert_eq!(picked.unwrap().1, Source::Fallback),
            (Some(c), Some(f)) => {
                let (entity, source) = picked.unwrap();
                prop_assert_eq!(entity.version, c.max(f));
                prop_assert_eq!(source, if f > c { Source::Fallback } else { Source::Cache });
            }
        }
    }

    /// Single-source ids come back unchanged; unknown ids are absent
    #[test]
    fn prop_single_source_passthrough(
        cache_only in "[a-m]{1,5}",
        fallback_only in "[n-z]{1,5}",
        v1 in any::<u64>(),
        v2 in any::<u64>(),
    ) {
        let (cache, fallback, resolver) = setup();
        fallback.install(&fallback_payload(&[(fallback_only.clone(), v2)], &HashSet::new())).unwrap();
        let cached = paywall(&cache_only, v1, "cache");
        cache.store_paywall(cached.clone());

        prop_assert_eq!(resolver.resolve_paywall(&cache_only), Some(VersionedEntity::new(cached, v1)));
        prop_assert_eq!(resolver.resolve_paywall(&fallback_only).unwrap().version, v2);
        prop_assert!(resolver.resolve_paywall("0-unknown").is_none());
    }

    /// Vendor ids are the set union of both sources, in either install order
    #[test]
    fn prop_vendor_id_union(cache_ids in id_set_strategy(), fallback_ids in id_set_strategy()) {
        let (cache, fallback, resolver) = setup();
        cache.store_product_vendor_ids(cache_ids.clone(), None);
        fallback.install(&fallback_payload(&[], &fallback_ids)).unwrap();

        let expected: HashSet<String> = cache_ids.union(&fallback_ids).cloned().collect();
        prop_assert_eq!(resolver.all_product_vendor_ids(), expected.clone());
        prop_assert_eq!(resolver.all_product_vendor_ids(), expected.clone());

        // Swap the roles of the two sources
        let (cache, fallback, resolver) = setup();
        cache.store_product_vendor_ids(fallback_ids.clone(), None);
        fallback.install(&fallback_payload(&[], &cache_ids)).unwrap();
        prop_assert_eq!(resolver.all_product_vendor_ids(), expected);
    }

    /// Batch resolution keeps request order and drops unknown ids
    #[test]
    fn prop_resolve_products_order(ids in prop::collection::vec("[a-f]{1,2}", 0..20)) {
        let (cache, _fallback, resolver) = setup();
        cache.store_products(["a", "b", "c"].iter().map(|id| BackendProduct {
            vendor_product_id: id.to_string(),
            introductory_offer_eligibility: Default::default(),
            promotional_offer_eligibility: false,
            timestamp: 1,
        }));

        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let resolved: Vec<String> = resolver
            .resolve_products(&refs)
            .into_iter()
            .map(|e| e.value.vendor_product_id)
            .collect();
        let expected: Vec<String> = ids
            .iter()
            .filter(|id| ["a", "b", "c"].contains(&id.as_str()))
            .cloned()
            .collect();
        prop_assert_eq!(resolved, expected);
    }
}

// =============================================================================
// Decoder Fuzz Tests
// =============================================================================

proptest! {
    /// Installing random bytes never panics and never disturbs a good snapshot
    #[test]
    fn fuzz_fallback_install_random_bytes(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
        let store = FallbackStore::new();
        store.install(&fallback_payload(&[("keep".into(), 3)], &HashSet::new())).unwrap();

        if store.install(&bytes).is_err() {
            prop_assert!(store.snapshot().unwrap().paywall("keep").is_some());
        }
    }

    /// Arbitrary JSON either decodes as a payload or fails cleanly
    #[test]
    fn fuzz_fallback_install_arbitrary_json(value in arbitrary_json_strategy()) {
        let store = FallbackStore::new();
        let serialized = serde_json::to_vec(&value).unwrap();
        let _ = store.install(&serialized);
    }

    /// Configuration responses with random bodies never panic
    #[test]
    fn fuzz_configuration_response(
        body in prop::collection::vec(any::<u8>(), 0..2048),
        hash in prop::option::of("[a-f0-9]{0,8}"),
    ) {
        let request = PaywallConfigurationRequest::new("v").with_response_hash(hash.clone());
        let headers: Vec<(String, String)> = hash
            .iter()
            .map(|h| ("x-response-hash".to_string(), h.clone()))
            .collect();
        let _ = request.decode_response(&headers, &body);
    }
}

// =============================================================================
// Signing Properties
// =============================================================================

proptest! {
    /// Same inputs, same Authorization header
    #[test]
    fn prop_signing_deterministic(
        body in prop::collection::vec(any::<u8>(), 0..512),
        path in "(/[a-z0-9]{1,8}){0,4}",
        secret in "[A-Za-z0-9/+]{1,40}",
        secs in 0i64..4_000_000_000,
    ) {
        let signer = RequestSigner::from_config(&SdkConfig::default());
        let credential = SigningCredential::new("AKID", secret, "token");
        let date = AmzDate::from_datetime(Utc.timestamp_opt(secs, 0).unwrap());
        let request = HttpRequest::post(format!("https://kinesis.us-east-1.amazonaws.com{}", path), body);

        let a = signer.sign_at(&request, &credential, &date).unwrap();
        let b = signer.sign_at(&request, &credential, &date).unwrap();
        prop_assert_eq!(a.header("Authorization"), b.header("Authorization"));
        prop_assert_eq!(&date.full()[..8], date.short());
    }

    /// Canonical headers are sorted lowercase names whatever the insertion order
    #[test]
    fn prop_canonical_headers_sorted(names in prop::collection::hash_set("[A-Za-z][A-Za-z-]{0,10}", 0..8)) {
        let mut request = HttpRequest::get("https://h/");
        for name in &names {
            request.set_header(name.clone(), "v");
        }
        let canonical = CanonicalRequest::from_request(&request).unwrap();
        let signed = canonical.signed_headers();
        let listed: Vec<&str> = if signed.is_empty() { vec![] } else { signed.split(';').collect() };

        let mut sorted = listed.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&listed, &sorted);
        prop_assert!(listed.iter().all(|n| *n == n.to_ascii_lowercase()));
    }
}

// =============================================================================
// Event Buffer Invariants
// =============================================================================

proptest! {
    /// Removing a snapshot's ids removes exactly that snapshot
    #[test]
    fn prop_buffer_removes_only_snapshot(
        before in 0usize..20,
        limit in 0usize..25,
        after in 0usize..20,
    ) {
        let buffer = EventBuffer::new();
        let record = |n: usize| -> EventRecord { [("n", n.to_string())].into_iter().collect() };

        for n in 0..before {
            buffer.push(record(n));
        }
        let snapshot = buffer.snapshot(limit);
        for n in before..before + after {
            buffer.push(record(n));
        }

        let ids = snapshot.iter().map(|e| e.id).collect();
        let removed = buffer.remove(&ids);

        let taken = limit.min(before);
        prop_assert_eq!(removed, taken);
        let expected: Vec<EventRecord> = (taken..before + after).map(record).collect();
        prop_assert_eq!(buffer.records(), expected);
    }
}
