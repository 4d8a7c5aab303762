//! Cover synchronization loop.
//!
//! Every tick drains the catalog's "no cover fetch yet" set: each game is
//! resolved against SteamGridDB with bounded concurrency and the result is
//! committed per game. Games SteamGridDB does not know are stamped with the
//! terminal missing marker; any other failure leaves the game untouched so
//! the next tick retries it.

pub mod error;
pub mod scheduler;
pub mod source;

pub use error::SyncError;
pub use scheduler::{CoverSync, SyncConfig, TickReport};
pub use source::{CoverFuture, CoverSource, cover_from_grid};
