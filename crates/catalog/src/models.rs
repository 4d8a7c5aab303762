//! Catalog record types.

use serde::{Deserialize, Serialize};

/// A Steam game known to the catalog.
///
/// `last_cover_fetch` is the sync-completion marker: `None` means the game
/// still needs a cover sync. `cover_provider_missing` is the terminal
/// negative marker set when SteamGridDB has no entry for the game; it is
/// always written together with `last_cover_fetch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steam_app_id: Option<u64>,
    #[serde(default)]
    pub header_image_url: String,
    #[serde(default)]
    pub capsule_image_url: String,
    #[serde(default)]
    pub library_image_url: String,
    #[serde(default)]
    pub capsule_filename: String,
    /// Unix timestamp in milliseconds of the last completed cover sync.
    #[serde(default)]
    pub last_cover_fetch: Option<i64>,
    #[serde(default)]
    pub cover_provider_missing: bool,
}

impl Game {
    /// Returns `true` if the game has not completed a cover sync yet.
    pub fn needs_cover_sync(&self) -> bool {
        self.last_cover_fetch.is_none()
    }

    /// Stamps a successful cover sync.
    pub fn mark_synced(&mut self, now_ms: i64) {
        self.last_cover_fetch = Some(now_ms);
    }

    /// Marks the game as permanently absent from the image provider.
    ///
    /// Also stamps the sync timestamp so the game leaves the unfetched set.
    pub fn mark_provider_missing(&mut self, now_ms: i64) {
        self.cover_provider_missing = true;
        self.last_cover_fetch = Some(now_ms);
    }
}

/// Content flags reported by SteamGridDB for an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverFlags {
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub humor: bool,
}

/// Uploader of a cover image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steam64: String,
    #[serde(default)]
    pub avatar: String,
}

/// A candidate cover image for a game.
///
/// `game_id` stays `None` until the sync loop attaches the cover to the
/// game it was fetched for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default)]
    pub id: String,
    pub steamgriddb_id: i64,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub flags: CoverFlags,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub thumb_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub author: Option<CoverAuthor>,
}

/// A game paired with a user's playtime (seconds as reported by Steam).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameWithPlaytime {
    pub game: Game,
    pub playtime: u64,
}

/// A Steam user whose library has been imported.
///
/// `game_ids` are catalog game ids, not Steam app ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub steam_id: u64,
    #[serde(default)]
    pub game_ids: Vec<String>,
}
