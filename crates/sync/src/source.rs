//! Where the sync loop gets covers from.

use std::future::Future;
use std::pin::Pin;

use covered_catalog::{Cover, CoverAuthor, CoverFlags};
use covered_steamgriddb::ImageData;

use crate::error::SyncError;

/// Boxed future returned by [`CoverSource`].
pub type CoverFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Cover>, SyncError>> + Send + 'a>>;

/// Resolves a Steam app to its candidate covers.
///
/// Implementations return [`SyncError::NotFound`] when the provider has no
/// entry for the app and [`SyncError::Provider`] for everything else. The
/// returned covers are not attached to a game yet.
pub trait CoverSource: Send + Sync {
    fn covers_for_steam_app(&self, steam_app_id: u64) -> CoverFuture<'_>;
}

impl CoverSource for covered_steamgriddb::Client {
    fn covers_for_steam_app(&self, steam_app_id: u64) -> CoverFuture<'_> {
        Box::pin(async move {
            let grids = self.grids_for_steam_app(steam_app_id).await?;
            Ok(grids.into_iter().map(cover_from_grid).collect())
        })
    }
}

/// Copies a SteamGridDB grid record into an unsaved, unattached cover.
pub fn cover_from_grid(grid: ImageData) -> Cover {
    Cover {
        id: String::new(),
        steamgriddb_id: grid.id,
        style: grid.style,
        game_id: None,
        width: grid.width,
        height: grid.height,
        flags: CoverFlags {
            nsfw: grid.nsfw,
            humor: grid.humor,
        },
        notes: grid.notes,
        mime: grid.mime,
        language: grid.language,
        thumb_url: grid.thumb,
        url: grid.url,
        author: grid.author.map(|a| CoverAuthor {
            name: a.name,
            steam64: a.steam64,
            avatar: a.avatar,
        }),
    }
}
