// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Pending analytics events.
//!
//! Every buffered record gets a process-unique id. A sync snapshots
//! `(id, record)` pairs and, on success, removes exactly those ids, so two
//! field-for-field identical events are never collapsed and a sync can only
//! remove what it actually sent.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::storage::{get_json, put_json, KeyValueStore, StorageError};

use super::event::EventRecord;

const EVENTS_KEY: &str = "cached_events";

/// A record together with its buffer-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedEvent {
    pub id: u64,
    pub record: EventRecord,
}

#[derive(Default)]
struct BufferInner {
    next_id: u64,
    events: Vec<BufferedEvent>,
}

impl BufferInner {
    fn push(&mut self, record: EventRecord) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(BufferedEvent { id, record });
        id
    }
}

/// Ordered, mutex-guarded event buffer with optional persistence.
///
/// Only records are persisted; ids are reassigned when a buffer is reloaded.
#[derive(Default)]
pub struct EventBuffer {
    inner: Mutex<BufferInner>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl EventBuffer {
    /// In-memory only buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer mirrored to `store`, reloading whatever a previous process left.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let mut inner = BufferInner::default();
        let restored: Vec<EventRecord> = get_json(store.as_ref(), EVENTS_KEY)?.unwrap_or_default();
        if !restored.is_empty() {
            debug!(count = restored.len(), "Restored pending analytics events");
        }
        for record in restored {
            inner.push(record);
        }
        Ok(Self {
            inner: Mutex::new(inner),
            store: Some(store),
        })
    }

    /// Append `record`, returning its id.
    pub fn push(&self, record: EventRecord) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.push(record);
        self.persist(&inner);
        crate::metrics::set_buffer_len(inner.events.len());
        id
    }

    /// Up to `limit` oldest events, in insertion order.
    #[must_use]
    pub fn snapshot(&self, limit: usize) -> Vec<BufferedEvent> {
        self.inner.lock().events.iter().take(limit).cloned().collect()
    }

    /// Drop every event whose id is in `ids`. Unknown ids are ignored.
    pub fn remove(&self, ids: &HashSet<u64>) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.events.len();
        inner.events.retain(|event| !ids.contains(&event.id));
        let removed = before - inner.events.len();
        if removed > 0 {
            self.persist(&inner);
        }
        crate::metrics::set_buffer_len(inner.events.len());
        removed
    }

    /// All pending records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.inner
            .lock()
            .events
            .iter()
            .map(|event| event.record.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    // Runs under the buffer lock so the stored copy follows mutation order.
    // A failed write keeps the in-memory buffer authoritative.
    fn persist(&self, inner: &BufferInner) {
        let Some(store) = &self.store else {
            return;
        };
        let records: Vec<&EventRecord> = inner.events.iter().map(|e| &e.record).collect();
        if let Err(e) = put_json(store.as_ref(), EVENTS_KEY, &records) {
            warn!(error = %e, "Failed to persist analytics events");
        }
    }
}
