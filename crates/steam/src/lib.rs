//! Steam Web API integration.
//!
//! - [`Client`]: owned games, family group lookup, shared library apps and
//!   the global app list.
//! - [`AppNameCache`]: process-wide app id → name table, rebuilt wholesale
//!   on a timer.

pub mod app_names;
pub mod client;
pub mod types;

pub use app_names::AppNameCache;
pub use client::{Client, Error};
pub use types::{OwnedGame, SharedApp};
