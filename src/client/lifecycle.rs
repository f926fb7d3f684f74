// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Client lifecycle: persistence and the background sync loop.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::storage::StorageError;

use super::PaywallClient;

impl PaywallClient {
    /// Write cached backend entities to the host store.
    ///
    /// No-op for a client created without a store.
    #[tracing::instrument(skip(self))]
    pub fn persist(&self) -> Result<(), StorageError> {
        let Some(store) = &self.store else {
            debug!("No store configured, nothing persisted");
            return Ok(());
        };
        self.cache.persist(store.as_ref())
    }

    /// Reload cached backend entities from the host store.
    #[tracing::instrument(skip(self))]
    pub fn restore(&self) -> Result<(), StorageError> {
        match &self.store {
            Some(store) => self.cache.restore(store.as_ref()),
            None => Ok(()),
        }
    }

    /// Start the periodic analytics sync loop on the current runtime.
    ///
    /// The loop runs until [`Self::shutdown`] and performs a final sync on exit.
    pub fn spawn_sync_loop(&self) -> JoinHandle<()> {
        let analytics = self.analytics.clone();
        let shutdown = self.shutdown.subscribe();
        info!(
            interval_secs = self.config.sync_interval_secs,
            "Spawning analytics sync loop"
        );
        tokio::spawn(async move { analytics.run(shutdown).await })
    }

    /// Ask the sync loop to flush and stop.
    pub fn shutdown(&self) {
        info!("Paywall client shutting down");
        self.shutdown.send_replace(true);
    }
}
