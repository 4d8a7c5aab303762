//! Process-wide Steam app name table.
//!
//! The table is rebuilt from scratch on every refresh and published by
//! swapping the whole `Arc`. Readers hold a snapshot and never see a
//! partially rebuilt table.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{Client, Error};

/// Read-mostly cache of Steam app id → app name.
#[derive(Default)]
pub struct AppNameCache {
    names: RwLock<Arc<HashMap<u32, String>>>,
}

impl AppNameCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current table.
    pub fn snapshot(&self) -> Arc<HashMap<u32, String>> {
        Arc::clone(&self.names.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the name for an app, if known.
    pub fn name_for(&self, app_id: u32) -> Option<String> {
        self.snapshot().get(&app_id).cloned()
    }

    /// Returns the number of known apps.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if no table has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Publishes a new table, replacing the previous one wholesale.
    pub fn replace(&self, table: HashMap<u32, String>) {
        *self.names.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
    }

    /// Downloads the app list and publishes it. Returns the table size.
    ///
    /// On failure the previous table stays in place.
    pub async fn refresh(&self, client: &Client) -> Result<usize, Error> {
        let table = client.app_list().await?;
        let count = table.len();
        self.replace(table);
        info!(apps = count, "loaded Steam app names");
        Ok(count)
    }

    /// Refreshes immediately, then every `interval`, until cancelled.
    ///
    /// `on_refresh` runs with the table size after every successful refresh.
    pub async fn run_refresh_loop<F>(
        self: Arc<Self>,
        client: Client,
        interval: Duration,
        cancel: CancellationToken,
        mut on_refresh: F,
    ) where
        F: FnMut(usize) + Send + 'static,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.refresh(&client).await {
                        Ok(count) => on_refresh(count),
                        Err(e) => {
                            warn!(error = %e, "failed to refresh Steam app names, keeping previous table");
                        }
                    }
                }
            }
        }
    }
}
