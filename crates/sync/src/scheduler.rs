//! The cover sync loop.

use std::sync::Arc;
use std::time::Duration;

use covered_catalog::{CatalogStore, Cover, Game};
use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::source::CoverSource;

/// Sync loop settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause between the end of one tick and the start of the next.
    pub interval: Duration,
    /// Maximum number of games fetched at once within a tick.
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            concurrency: 50,
        }
    }
}

/// Outcome counts of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Games that were waiting for a sync when the tick started.
    pub games: usize,
    /// Games stamped with covers (possibly zero covers).
    pub synced: usize,
    /// Games stamped with the terminal missing marker.
    pub missing: usize,
    /// Games left untouched for a retry.
    pub failed: usize,
    pub covers_saved: usize,
}

enum GameOutcome {
    Synced(usize),
    Missing,
    Failed,
}

/// Drives cover syncs for every game that has not been synced yet.
pub struct CoverSync {
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn CoverSource>,
    config: SyncConfig,
}

impl CoverSync {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        source: Arc<dyn CoverSource>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    /// Runs ticks until cancelled.
    ///
    /// Ticks never overlap: the next one is scheduled `interval` after the
    /// previous one finished. Cancellation is observed between ticks only.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            concurrency = self.config.concurrency,
            "cover sync started"
        );

        loop {
            match self.run_tick().await {
                Ok(report) if report.games > 0 => {
                    info!(
                        games = report.games,
                        synced = report.synced,
                        missing = report.missing,
                        failed = report.failed,
                        covers = report.covers_saved,
                        "sync tick finished"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "sync tick failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("cover sync stopped");
    }

    /// Runs a single tick over the current unfetched set.
    ///
    /// Only a failure to read the unfetched set is returned as an error;
    /// per-game failures are logged and counted in the report.
    pub async fn run_tick(&self) -> Result<TickReport, SyncError> {
        let games = self.store.games_without_cover_fetch()?;
        let mut report = TickReport {
            games: games.len(),
            ..Default::default()
        };
        if games.is_empty() {
            return Ok(report);
        }

        let concurrency = self.config.concurrency.clamp(1, games.len());
        info!(games = games.len(), concurrency, "found games without fetched covers");

        let mut outcomes = stream::iter(games)
            .map(|game| self.sync_game(game))
            .buffer_unordered(concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                GameOutcome::Synced(covers) => {
                    report.synced += 1;
                    report.covers_saved += covers;
                }
                GameOutcome::Missing => report.missing += 1,
                GameOutcome::Failed => report.failed += 1,
            }
        }

        Ok(report)
    }

    /// Fetches and commits covers for one game.
    async fn sync_game(&self, game: Game) -> GameOutcome {
        let Some(app_id) = game.steam_app_id else {
            warn!(game = %game.name, id = %game.id, "game has no steam app id, cannot sync covers");
            return GameOutcome::Failed;
        };

        debug!(game = %game.name, app_id, "fetching covers");
        let (covers, provider_missing) = match self.source.covers_for_steam_app(app_id).await {
            Ok(covers) => (covers, false),
            Err(e) if e.is_not_found() => {
                info!(game = %game.name, app_id, "no SteamGridDB entry, marking covers as missing");
                (Vec::new(), true)
            }
            Err(e) => {
                warn!(game = %game.name, app_id, error = %e, "failed to fetch covers, will retry");
                return GameOutcome::Failed;
            }
        };

        // Store calls block on file IO.
        let store = Arc::clone(&self.store);
        let committed = tokio::task::spawn_blocking(move || {
            commit(store.as_ref(), app_id, covers, provider_missing)
        })
        .await;

        match committed {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(game = %game.name, app_id, error = %e, "failed to save cover sync result");
                GameOutcome::Failed
            }
            Err(e) => {
                error!(game = %game.name, app_id, error = %e, "cover sync commit task failed");
                GameOutcome::Failed
            }
        }
    }
}

/// Stamps the freshly re-read game and saves it with its covers in one
/// store call.
fn commit(
    store: &dyn CatalogStore,
    app_id: u64,
    covers: Vec<Cover>,
    provider_missing: bool,
) -> Result<GameOutcome, SyncError> {
    // Re-read: the game may have been modified or removed while fetching.
    let Some(mut game) = store.find_game_by_steam_id(app_id)? else {
        warn!(app_id, "game disappeared during cover sync, dropping result");
        return Ok(GameOutcome::Failed);
    };

    let now = chrono::Utc::now().timestamp_millis();
    if provider_missing {
        game.mark_provider_missing(now);
    } else {
        game.mark_synced(now);
    }

    let covers: Vec<Cover> = covers
        .into_iter()
        .map(|mut cover| {
            cover.game_id = Some(game.id.clone());
            cover
        })
        .collect();
    let count = covers.len();

    let game = store.save_fetch_result(game, covers)?;
    if provider_missing {
        Ok(GameOutcome::Missing)
    } else {
        info!(game = %game.name, covers = count, "fetched covers");
        Ok(GameOutcome::Synced(count))
    }
}
