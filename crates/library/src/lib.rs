//! Game library import.
//!
//! Turns a Steam user's owned or family-shared games into catalog games,
//! creating each game the first time it is seen so the cover sync loop
//! picks it up. Imported users are recorded with links to their games.

pub mod error;
pub mod library;
pub mod source;
pub mod users;

pub use error::LibraryError;
pub use library::{GameLibrary, UNKNOWN_GAME_NAME, store_image_url, unresolved_count};
pub use source::{LibraryFuture, LibrarySource};
pub use users::{SteamUserRef, parse_steam_user};
