//! Catalog persistence.
//!
//! [`CatalogStore`] is the record-store boundary: find by id, find by
//! predicate, save. Each `save_*` call is atomic per call, which is all the
//! sync loop relies on.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Cover, Game, User};

/// Record store for games, covers and users.
pub trait CatalogStore: Send + Sync {
    /// Returns every game whose cover sync has not completed.
    fn games_without_cover_fetch(&self) -> Result<Vec<Game>, StoreError>;

    /// Looks up a game by its Steam app id.
    fn find_game_by_steam_id(&self, app_id: u64) -> Result<Option<Game>, StoreError>;

    /// Looks up a game by catalog id.
    fn find_game_by_id(&self, id: &str) -> Result<Option<Game>, StoreError>;

    /// Inserts or replaces a game. An empty id is replaced by a fresh UUID.
    fn save_game(&self, game: Game) -> Result<Game, StoreError>;

    /// Inserts or replaces covers. Empty ids are replaced by fresh UUIDs.
    fn save_covers(&self, covers: Vec<Cover>) -> Result<Vec<Cover>, StoreError>;

    /// Commits the outcome of one cover sync: the covers and the stamped game.
    fn save_fetch_result(&self, game: Game, covers: Vec<Cover>) -> Result<Game, StoreError> {
        if !covers.is_empty() {
            self.save_covers(covers)?;
        }
        self.save_game(game)
    }

    /// Looks up a cover by catalog id.
    fn find_cover_by_id(&self, id: &str) -> Result<Option<Cover>, StoreError>;

    /// Returns all covers attached to a game.
    fn covers_for_game(&self, game_id: &str) -> Result<Vec<Cover>, StoreError>;

    /// Returns all covers attached to any of the given games.
    fn covers_for_games(&self, game_ids: &[String]) -> Result<Vec<Cover>, StoreError>;

    /// Lists games sorted by name, optionally filtered by a case-insensitive
    /// substring of the name.
    fn list_games(&self, search: Option<&str>) -> Result<Vec<Game>, StoreError>;

    /// Deletes a game. Covers referencing it are left in place.
    fn delete_game(&self, id: &str) -> Result<bool, StoreError>;

    /// Returns the number of stored covers.
    fn count_covers(&self) -> Result<usize, StoreError>;

    /// Inserts or replaces a user. An empty id is replaced by a fresh UUID.
    fn save_user(&self, user: User) -> Result<User, StoreError>;

    fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    fn find_user_by_steam_id(&self, steam_id: u64) -> Result<Option<User>, StoreError>;

    /// Lists users sorted by username.
    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Deletes a user. Their games stay in the catalog.
    fn delete_user(&self, id: &str) -> Result<bool, StoreError>;
}

/// On-disk shape of the catalog.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CatalogState {
    #[serde(default)]
    games: BTreeMap<String, Game>,
    #[serde(default)]
    covers: BTreeMap<String, Cover>,
    #[serde(default)]
    users: BTreeMap<String, User>,
}

/// Identifies one version of the catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// The cached state and the file version it was read from.
#[derive(Debug, Default)]
struct Snapshot {
    state: CatalogState,
    stamp: Option<FileStamp>,
}

/// Catalog store kept in memory and mirrored to a JSON file.
///
/// The file is the source of truth, so several handles (or processes) can
/// share one catalog:
///
/// - Reads reload the cache when the file changed since it was last seen.
/// - Writes reload the file under the write lock, apply the change to that
///   fresh copy, and persist it (temp file + rename). The cache is replaced
///   only after the rename succeeds, so a failed write changes nothing.
pub struct JsonCatalogStore {
    path: Option<PathBuf>,
    snapshot: RwLock<Snapshot>,
}

impl JsonCatalogStore {
    /// Opens a store backed by `path`, loading existing records if present.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let snapshot = load_snapshot(&path)?;
        Ok(Self {
            path: Some(path),
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Creates a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    fn lock_read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached state, reloading it first if the file moved on.
    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>, StoreError> {
        if let Some(path) = &self.path {
            if self.lock_read().stamp != FileStamp::of(path) {
                let mut snapshot = self.lock_write();
                if snapshot.stamp != FileStamp::of(path) {
                    *snapshot = load_snapshot(path)?;
                }
            }
        }
        Ok(self.lock_read())
    }

    /// Applies `change` to the latest state and commits it.
    fn update<T>(&self, change: impl FnOnce(&mut CatalogState) -> T) -> Result<T, StoreError> {
        let mut snapshot = self.lock_write();
        let mut staged = match &self.path {
            Some(path) => load_snapshot(path)?.state,
            None => snapshot.state.clone(),
        };
        let out = change(&mut staged);
        let stamp = self.persist(&staged)?;
        *snapshot = Snapshot {
            state: staged,
            stamp,
        };
        Ok(out)
    }

    /// Writes `state` to disk and returns the stamp of the new file.
    fn persist(&self, state: &CatalogState) -> Result<Option<FileStamp>, StoreError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(state)?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!(
            games = state.games.len(),
            covers = state.covers.len(),
            users = state.users.len(),
            "persisted catalog to {:?}",
            path
        );
        Ok(FileStamp::of(path))
    }
}

/// Per-process temp file, so two writers never share one.
fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!("json.{}.tmp", std::process::id()))
}

fn assign_id(id: &mut String) {
    if id.is_empty() {
        *id = uuid::Uuid::new_v4().to_string();
    }
}

fn insert_covers(state: &mut CatalogState, covers: Vec<Cover>) -> Vec<Cover> {
    covers
        .into_iter()
        .map(|mut cover| {
            assign_id(&mut cover.id);
            state.covers.insert(cover.id.clone(), cover.clone());
            cover
        })
        .collect()
}

impl CatalogStore for JsonCatalogStore {
    fn games_without_cover_fetch(&self) -> Result<Vec<Game>, StoreError> {
        Ok(self
            .read()?
            .state
            .games
            .values()
            .filter(|g| g.needs_cover_sync())
            .cloned()
            .collect())
    }

    fn find_game_by_steam_id(&self, app_id: u64) -> Result<Option<Game>, StoreError> {
        Ok(self
            .read()?
            .state
            .games
            .values()
            .find(|g| g.steam_app_id == Some(app_id))
            .cloned())
    }

    fn find_game_by_id(&self, id: &str) -> Result<Option<Game>, StoreError> {
        Ok(self.read()?.state.games.get(id).cloned())
    }

    fn save_game(&self, mut game: Game) -> Result<Game, StoreError> {
        assign_id(&mut game.id);
        self.update(|state| {
            state.games.insert(game.id.clone(), game.clone());
        })?;
        Ok(game)
    }

    fn save_covers(&self, covers: Vec<Cover>) -> Result<Vec<Cover>, StoreError> {
        self.update(|state| insert_covers(state, covers))
    }

    fn save_fetch_result(&self, mut game: Game, covers: Vec<Cover>) -> Result<Game, StoreError> {
        assign_id(&mut game.id);
        self.update(|state| {
            insert_covers(state, covers);
            state.games.insert(game.id.clone(), game.clone());
        })?;
        Ok(game)
    }

    fn find_cover_by_id(&self, id: &str) -> Result<Option<Cover>, StoreError> {
        Ok(self.read()?.state.covers.get(id).cloned())
    }

    fn covers_for_game(&self, game_id: &str) -> Result<Vec<Cover>, StoreError> {
        Ok(self
            .read()?
            .state
            .covers
            .values()
            .filter(|c| c.game_id.as_deref() == Some(game_id))
            .cloned()
            .collect())
    }

    fn covers_for_games(&self, game_ids: &[String]) -> Result<Vec<Cover>, StoreError> {
        let wanted: HashSet<&str> = game_ids.iter().map(String::as_str).collect();
        Ok(self
            .read()?
            .state
            .covers
            .values()
            .filter(|c| c.game_id.as_deref().is_some_and(|id| wanted.contains(id)))
            .cloned()
            .collect())
    }

    fn list_games(&self, search: Option<&str>) -> Result<Vec<Game>, StoreError> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut games: Vec<Game> = self
            .read()?
            .state
            .games
            .values()
            .filter(|g| {
                needle
                    .as_ref()
                    .is_none_or(|n| g.name.to_lowercase().contains(n.as_str()))
            })
            .cloned()
            .collect();
        games.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(games)
    }

    fn delete_game(&self, id: &str) -> Result<bool, StoreError> {
        if self.find_game_by_id(id)?.is_none() {
            return Ok(false);
        }
        self.update(|state| state.games.remove(id).is_some())
    }

    fn count_covers(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.state.covers.len())
    }

    fn save_user(&self, mut user: User) -> Result<User, StoreError> {
        assign_id(&mut user.id);
        self.update(|state| {
            state.users.insert(user.id.clone(), user.clone());
        })?;
        Ok(user)
    }

    fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.state.users.get(id).cloned())
    }

    fn find_user_by_steam_id(&self, steam_id: u64) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .state
            .users
            .values()
            .find(|u| u.steam_id == steam_id)
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read()?.state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        if self.find_user_by_id(id)?.is_none() {
            return Ok(false);
        }
        self.update(|state| state.users.remove(id).is_some())
    }
}

/// Loads the catalog from a JSON file on disk.
fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let stamp = FileStamp::of(path);
    if stamp.is_none() {
        return Ok(Snapshot::default());
    }
    let data = std::fs::read(path)?;
    let state: CatalogState = serde_json::from_slice(&data)?;
    debug!(
        games = state.games.len(),
        covers = state.covers.len(),
        users = state.users.len(),
        "loaded catalog from {:?}",
        path
    );
    Ok(Snapshot { state, stamp })
}
