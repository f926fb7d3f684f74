// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Batch wire form and the transport seam.
//!
//! ```text
//! {"Records":[{"Data":"<base64(json(record))>","PartitionKey":"<installation meta id>"}],
//!  "StreamName":"<stream>"}
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use thiserror::Error;

use crate::signing::HttpRequest;

use super::event::EventRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransmissionError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("ingestion rejected batch (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Sends a fully signed request. Implemented by the host's HTTP client.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<(), TransmissionError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordsBody<'a> {
    records: Vec<PutRecord<'a>>,
    stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecord<'a> {
    data: String,
    partition_key: &'a str,
}

/// Encode `records` as one batch submission body.
pub fn encode_batch<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    stream_name: &str,
    partition_key: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    let records = records
        .into_iter()
        .map(|record| {
            Ok(PutRecord {
                data: STANDARD.encode(serde_json::to_vec(record)?),
                partition_key,
            })
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    serde_json::to_vec(&PutRecordsBody {
        records,
        stream_name,
    })
}
