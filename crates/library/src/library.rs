//! Library service: Steam listings in, catalog games out.

use std::sync::Arc;

use covered_catalog::{CatalogStore, Game, GameWithPlaytime, User};
use covered_steam::AppNameCache;
use tracing::{debug, info, warn};

use crate::error::LibraryError;
use crate::source::LibrarySource;
use crate::users::{SteamUserRef, parse_steam_user};

/// Name given to games that arrive without one and are not in the app list.
pub const UNKNOWN_GAME_NAME: &str = "Unknown Game";

const STORE_ASSETS_URL: &str = "https://shared.akamai.steamstatic.com/store_item_assets/steam/apps";

/// Returns the Steam store CDN URL of one of an app's standard images.
pub fn store_image_url(app_id: u64, file: &str) -> String {
    format!("{STORE_ASSETS_URL}/{app_id}/{file}")
}

/// Counts the games still waiting for a cover sync.
pub fn unresolved_count<'a>(games: impl IntoIterator<Item = &'a Game>) -> usize {
    games
        .into_iter()
        .filter(|game| game.needs_cover_sync())
        .count()
}

/// Imports Steam libraries into the catalog.
pub struct GameLibrary {
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn LibrarySource>,
    names: Arc<AppNameCache>,
}

impl GameLibrary {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        source: Arc<dyn LibrarySource>,
        names: Arc<AppNameCache>,
    ) -> Self {
        Self {
            store,
            source,
            names,
        }
    }

    /// Returns a user's owned games with lifetime playtime, creating any
    /// game the catalog has not seen yet.
    pub async fn games_for_player(
        &self,
        steam_user_id: u64,
    ) -> Result<Vec<GameWithPlaytime>, LibraryError> {
        let owned = self.source.owned_games(steam_user_id).await?;
        info!(steam_user_id, games = owned.len(), "loaded owned games");

        owned
            .into_iter()
            .map(|owned| -> Result<GameWithPlaytime, LibraryError> {
                let game = self.get_or_create(owned.appid, &owned.name, &owned.capsule_filename)?;
                Ok(GameWithPlaytime {
                    game,
                    playtime: owned.playtime_forever,
                })
            })
            .collect()
    }

    /// Returns the games shared in the user's Steam family.
    ///
    /// Any failure on the family path, including the user not being in a
    /// family, falls back to [`games_for_player`](Self::games_for_player).
    /// A family that shares nothing yields an empty list.
    pub async fn games_for_family(
        &self,
        steam_user_id: u64,
        access_token: &str,
    ) -> Result<Vec<GameWithPlaytime>, LibraryError> {
        match self.family_games(steam_user_id, access_token).await {
            Ok(Some(games)) => Ok(games),
            Ok(None) => {
                info!(steam_user_id, "user has no family group, using owned games");
                self.games_for_player(steam_user_id).await
            }
            Err(e) => {
                warn!(steam_user_id, error = %e, "family library failed, using owned games");
                self.games_for_player(steam_user_id).await
            }
        }
    }

    async fn family_games(
        &self,
        steam_user_id: u64,
        access_token: &str,
    ) -> Result<Option<Vec<GameWithPlaytime>>, LibraryError> {
        let Some(family_id) = self
            .source
            .family_group_for_user(steam_user_id, access_token)
            .await?
        else {
            return Ok(None);
        };

        let apps = self
            .source
            .shared_library_apps(family_id, access_token)
            .await?;
        if apps.is_empty() {
            info!(family_id, "no shared library apps found");
            return Ok(Some(Vec::new()));
        }

        let games = apps
            .into_iter()
            .map(|app| -> Result<GameWithPlaytime, LibraryError> {
                let game = self.get_or_create(app.appid, &app.name, &app.capsule_filename)?;
                Ok(GameWithPlaytime {
                    game,
                    playtime: app.rt_playtime,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(games))
    }

    /// Turns a Steam id, vanity name or profile URL into a Steam id.
    pub async fn resolve_steam_user(&self, input: &str) -> Result<u64, LibraryError> {
        match parse_steam_user(input) {
            Some(SteamUserRef::Id(id)) => Ok(id),
            Some(SteamUserRef::Vanity(name)) => self
                .source
                .resolve_vanity_url(&name)
                .await?
                .ok_or_else(|| LibraryError::UnknownUser(input.trim().to_string())),
            None => Err(LibraryError::UnknownUser(input.trim().to_string())),
        }
    }

    /// Imports a user's owned games and records the user with links to
    /// them. Adding a known Steam id refreshes that user's record.
    ///
    /// A blank `username` keeps the stored one, or falls back to the id.
    pub async fn add_user(&self, steam_id: u64, username: &str) -> Result<User, LibraryError> {
        let games = self.games_for_player(steam_id).await?;
        let mut user = self
            .store
            .find_user_by_steam_id(steam_id)?
            .unwrap_or_else(|| User {
                steam_id,
                ..Default::default()
            });

        match username.trim() {
            "" if user.username.is_empty() => user.username = steam_id.to_string(),
            "" => {}
            name => user.username = name.to_string(),
        }
        user.game_ids = games.into_iter().map(|entry| entry.game.id).collect();

        let user = self.store.save_user(user)?;
        info!(user = %user.username, steam_id, games = user.game_ids.len(), "saved user");
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>, LibraryError> {
        Ok(self.store.list_users()?)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, LibraryError> {
        Ok(self.store.find_user_by_id(id)?)
    }

    /// Returns the catalog games linked to a user. Links to deleted games
    /// are skipped.
    pub fn user_games(&self, user: &User) -> Result<Vec<Game>, LibraryError> {
        let mut games = Vec::with_capacity(user.game_ids.len());
        for id in &user.game_ids {
            if let Some(game) = self.store.find_game_by_id(id)? {
                games.push(game);
            }
        }
        Ok(games)
    }

    /// Deletes a user record. Their games stay in the catalog.
    pub fn remove_user(&self, id: &str) -> Result<bool, LibraryError> {
        Ok(self.store.delete_user(id)?)
    }

    /// Renames games stored as [`UNKNOWN_GAME_NAME`] once the app list
    /// knows them. Returns how many were renamed.
    pub fn backfill_unknown_names(&self) -> Result<usize, LibraryError> {
        let mut renamed = 0;
        for mut game in self.store.list_games(Some(UNKNOWN_GAME_NAME))? {
            if game.name != UNKNOWN_GAME_NAME {
                continue;
            }
            let Some(name) = game
                .steam_app_id
                .and_then(|id| u32::try_from(id).ok())
                .and_then(|id| self.names.name_for(id))
            else {
                continue;
            };
            debug!(id = %game.id, name = %name, "named unknown game");
            game.name = name;
            self.store.save_game(game)?;
            renamed += 1;
        }
        if renamed > 0 {
            info!(renamed, "filled in names of unknown games");
        }
        Ok(renamed)
    }

    /// Returns the game for a Steam app, creating it if needed.
    pub fn load_game(
        &self,
        app_id: u64,
        name: &str,
        capsule_filename: &str,
    ) -> Result<Game, LibraryError> {
        self.get_or_create(app_id, name, capsule_filename)
    }

    fn get_or_create(
        &self,
        app_id: u64,
        name: &str,
        capsule_filename: &str,
    ) -> Result<Game, LibraryError> {
        if let Some(game) = self.store.find_game_by_steam_id(app_id)? {
            return Ok(game);
        }

        let game = self.store.save_game(self.new_game(app_id, name, capsule_filename))?;
        debug!(app_id, game = %game.name, id = %game.id, "created game");
        Ok(game)
    }

    fn new_game(&self, app_id: u64, name: &str, capsule_filename: &str) -> Game {
        let name = match name.trim() {
            "" => u32::try_from(app_id)
                .ok()
                .and_then(|id| self.names.name_for(id))
                .unwrap_or_else(|| UNKNOWN_GAME_NAME.to_string()),
            name => name.to_string(),
        };

        Game {
            id: String::new(),
            name,
            steam_app_id: Some(app_id),
            header_image_url: store_image_url(app_id, "header.jpg"),
            capsule_image_url: store_image_url(app_id, "capsule_231x87.jpg"),
            library_image_url: store_image_url(app_id, "library_600x900.jpg"),
            capsule_filename: capsule_filename.to_string(),
            last_cover_fetch: None,
            cover_provider_missing: false,
        }
    }
}
