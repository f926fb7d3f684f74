// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Analytics event buffering and signed batch delivery.
//!
//! # Flow
//!
//! ```text
//! record(type, params)
//!   │ identity + consent checked on the caller's thread (fail fast)
//!   ▼
//! tokio::spawn ──► EventBuffer::push ──► sync()   (when sync_on_record)
//!
//! sync()
//!   snapshot S (oldest max_batch_records, with buffer ids)
//!   ──► PutRecords body ──► RequestSigner ──► EventTransport::send
//!   success: remove ids(S)      failure: buffer untouched, retried later
//! ```
//!
//! # Sync state
//!
//! ```text
//! Idle ──record──► Buffering ──sync──► Syncing ──► SyncSucceeded | SyncFailed
//! ```
//!
//! Delivery is at-least-once: overlapping syncs may both send an event, but
//! a sync only ever removes the records it snapshotted itself, so a failing
//! sync can never discard what a concurrent one did not deliver.

mod buffer;
mod event;
mod identity;
mod transport;

pub use buffer::{BufferedEvent, EventBuffer};
pub use event::{EventRecord, EventType};
pub use identity::{IdentityProvider, Installation, StaticIdentity};
pub use transport::{encode_batch, EventTransport, TransmissionError};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SdkConfig;
use crate::metrics::LatencyTimer;
use crate::signing::{HttpRequest, RequestSigner, SigningError};

use event::Stamp;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("no installation registered for this device")]
    MissingIdentity,
    #[error("analytics disabled by the app")]
    ConsentDisabled,
    #[error("batch could not be signed: {0}")]
    Signing(#[from] SigningError),
    #[error("batch transmission failed: {0}")]
    Transmission(#[from] TransmissionError),
    #[error("batch could not be encoded: {0}")]
    Encoding(#[source] serde_json::Error),
    #[error("background task failed: {0}")]
    Background(String),
}

impl AnalyticsError {
    fn kind(&self) -> &'static str {
        match self {
            Self::MissingIdentity => "missing_identity",
            Self::ConsentDisabled => "consent_disabled",
            Self::Signing(_) => "signing",
            Self::Transmission(_) => "transmission",
            Self::Encoding(_) => "encoding",
            Self::Background(_) => "background",
        }
    }
}

/// Where the sync driver currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Buffering,
    Syncing,
    SyncSucceeded,
    SyncFailed,
}

/// Completion of one [`Analytics::record`] call.
pub type RecordHandle = JoinHandle<Result<(), AnalyticsError>>;

/// Event buffer plus the driver that signs and ships it.
pub struct Analytics {
    identity: Arc<dyn IdentityProvider>,
    transport: Arc<dyn EventTransport>,
    signer: RequestSigner,
    buffer: EventBuffer,
    session_id: String,
    ingestion_url: String,
    stream_name: String,
    max_batch_records: usize,
    sync_on_record: bool,
    sync_interval: Duration,
    state: watch::Sender<SyncState>,
}

impl Analytics {
    pub fn new(
        config: &SdkConfig,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn EventTransport>,
        buffer: EventBuffer,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            identity,
            transport,
            signer: RequestSigner::from_config(config),
            buffer,
            session_id: Uuid::new_v4().to_string(),
            ingestion_url: config.ingestion_url.clone(),
            stream_name: config.stream_name.clone(),
            max_batch_records: config.max_batch_records.max(1),
            sync_on_record: config.sync_on_record,
            sync_interval: Duration::from_secs(config.sync_interval_secs),
            state,
        }
    }

    /// Session id stamped on every event of this process.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Record an event.
    ///
    /// Missing identity and disabled analytics are reported right away and
    /// nothing is buffered. Otherwise the stamped event is buffered (and a
    /// sync started, if configured) on a background task whose handle is
    /// returned; it resolves exactly once with the outcome.
    pub fn record(
        self: &Arc<Self>,
        event_type: EventType,
        params: HashMap<String, String>,
    ) -> Result<RecordHandle, AnalyticsError> {
        let record = self.prepare(event_type, params)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AnalyticsError::Background(e.to_string()))?;

        let this = Arc::clone(self);
        Ok(runtime.spawn(async move { this.buffer_and_sync(record).await }))
    }

    fn prepare(
        &self,
        event_type: EventType,
        params: HashMap<String, String>,
    ) -> Result<EventRecord, AnalyticsError> {
        let Some(installation) = self.identity.installation() else {
            error!(event = %event_type, "Can't find cached installation, event dropped");
            crate::metrics::record_event_rejected("missing_identity");
            return Err(AnalyticsError::MissingIdentity);
        };

        if self.identity.analytics_disabled() {
            if event_type == EventType::PaywallShowed {
                info!(event = %event_type, "External analytics disabled, event not recorded");
            }
            crate::metrics::record_event_rejected("consent_disabled");
            return Err(AnalyticsError::ConsentDisabled);
        }

        let profile_id = self.identity.profile_id();
        let platform = self.identity.platform();
        let stamp = Stamp {
            profile_id: &profile_id,
            installation_meta_id: &installation.profile_installation_meta_id,
            session_id: &self.session_id,
            platform: &platform,
            at: Utc::now(),
        };
        Ok(EventRecord::stamped(event_type, &stamp, params))
    }

    async fn buffer_and_sync(&self, record: EventRecord) -> Result<(), AnalyticsError> {
        let event_name = record.event_name().unwrap_or_default().to_string();
        let id = self.buffer.push(record);
        crate::metrics::record_event_buffered(&event_name);
        self.state.send_replace(SyncState::Buffering);
        debug!(id, event = %event_name, pending = self.buffer.len(), "Event buffered");

        if self.sync_on_record {
            self.sync().await?;
        }
        Ok(())
    }

    /// Send the oldest pending events as one signed batch.
    ///
    /// Returns how many events were removed from the buffer. On any failure
    /// the buffer is left exactly as it was.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self) -> Result<usize, AnalyticsError> {
        let batch = self.buffer.snapshot(self.max_batch_records);
        if batch.is_empty() {
            self.state.send_replace(SyncState::Idle);
            crate::metrics::record_sync("empty", 0);
            return Ok(0);
        }

        self.state.send_replace(SyncState::Syncing);
        let _timer = LatencyTimer::new("sync");

        match self.transmit(&batch).await {
            Ok(()) => {
                let ids: HashSet<u64> = batch.iter().map(|event| event.id).collect();
                let removed = self.buffer.remove(&ids);
                self.state.send_replace(SyncState::SyncSucceeded);
                crate::metrics::record_sync("success", batch.len());
                info!(sent = batch.len(), remaining = self.buffer.len(), "Analytics batch delivered");
                Ok(removed)
            }
            Err(e) => {
                self.state.send_replace(SyncState::SyncFailed);
                crate::metrics::record_sync("error", batch.len());
                warn!(
                    error = %e,
                    kind = e.kind(),
                    pending = self.buffer.len(),
                    "Analytics sync failed, events kept for retry"
                );
                Err(e)
            }
        }
    }

    async fn transmit(&self, batch: &[BufferedEvent]) -> Result<(), AnalyticsError> {
        let installation = self
            .identity
            .installation()
            .ok_or(AnalyticsError::MissingIdentity)?;

        let body = encode_batch(
            batch.iter().map(|event| &event.record),
            &self.stream_name,
            &installation.profile_installation_meta_id,
        )
        .map_err(AnalyticsError::Encoding)?;

        let request = HttpRequest::post(self.ingestion_url.clone(), body);
        let signed = self.signer.sign(&request, &installation.credential())?;
        self.transport.send(signed).await?;
        Ok(())
    }

    /// Periodic sync loop. Exits when `shutdown` turns `true` (or its sender
    /// is dropped), after one last sync.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = (!self.sync_interval.is_zero()).then(|| {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + self.sync_interval, self.sync_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        info!(interval_secs = self.sync_interval.as_secs(), "Analytics sync loop running");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    if let Err(e) = self.sync().await {
                        debug!(error = %e, "Periodic analytics sync failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(pending = self.buffer.len(), "Flushing analytics before shutdown");
        if let Err(e) = self.sync().await {
            warn!(error = %e, "Final analytics sync failed");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
