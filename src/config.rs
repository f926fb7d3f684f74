// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the paywall client.
//!
//! # Example
//!
//! ```
//! use paywall_sync::SdkConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SdkConfig::default();
//! assert_eq!(config.max_batch_records, 500);
//!
//! // Override what differs per deployment
//! let config = SdkConfig {
//!     stream_name: "events-staging".into(),
//!     sync_interval_secs: 0, // periodic sync disabled
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the paywall client.
///
/// All fields have defaults matching the production ingestion pipeline.
/// A config is constructed once and handed to [`crate::PaywallClient::new`];
/// nothing in the crate reads process-wide configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SdkConfig {
    /// Base URL for backend API requests (paywall configuration fetch)
    #[serde(default = "default_backend_base_url")]
    pub backend_base_url: String,

    /// Analytics ingestion endpoint (receives signed batch submissions)
    #[serde(default = "default_ingestion_url")]
    pub ingestion_url: String,

    /// Stream the analytics batches are written to
    #[serde(default = "default_stream_name")]
    pub stream_name: String,

    /// Signing scope
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_service")]
    pub service: String,

    /// Fixed `X-Amz-Target` header value
    #[serde(default = "default_amz_target")]
    pub amz_target: String,

    /// Fixed `Content-Type` header value for batch submissions
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Max records per batch submission (ingestion service limit is 500)
    #[serde(default = "default_max_batch_records")]
    pub max_batch_records: usize,

    /// Kick off a background sync after every recorded event
    #[serde(default = "default_sync_on_record")]
    pub sync_on_record: bool,

    /// Periodic sync interval in seconds (0 = disabled)
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

fn default_backend_base_url() -> String { "https://api.paywall-backend.io/api/v1".into() }
fn default_ingestion_url() -> String { "https://kinesis.us-east-1.amazonaws.com/".into() }
fn default_stream_name() -> String { "paywall-data-pipeline-prod".into() }
fn default_region() -> String { "us-east-1".into() }
fn default_service() -> String { "kinesis".into() }
fn default_amz_target() -> String { "Kinesis_20131202.PutRecords".into() }
fn default_content_type() -> String { "application/x-amz-json-1.1".into() }
fn default_max_batch_records() -> usize { 500 }
fn default_sync_on_record() -> bool { true }
fn default_sync_interval_secs() -> u64 { 60 }

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            backend_base_url: default_backend_base_url(),
            ingestion_url: default_ingestion_url(),
            stream_name: default_stream_name(),
            region: default_region(),
            service: default_service(),
            amz_target: default_amz_target(),
            content_type: default_content_type(),
            max_batch_records: default_max_batch_records(),
            sync_on_record: default_sync_on_record(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}
