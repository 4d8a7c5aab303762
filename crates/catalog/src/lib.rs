//! Game and cover catalog.
//!
//! Holds the persisted record types ([`Game`], [`Cover`] and [`User`]) and the
//! [`CatalogStore`] trait the sync loop, export builder and library service
//! read and write through. [`JsonCatalogStore`] is the bundled
//! implementation: in-memory maps optionally mirrored to a JSON file.

pub mod error;
pub mod models;
pub mod store;

pub use error::StoreError;
pub use models::{Cover, CoverAuthor, CoverFlags, Game, GameWithPlaytime, User};
pub use store::{CatalogStore, JsonCatalogStore};
