//! SteamGridDB API client for cover metadata.
//!
//! Provides an async client for the [SteamGridDB](https://www.steamgriddb.com)
//! API v2: resolving a Steam app id to a SteamGridDB game id and listing
//! every grid (cover) image for that game across all result pages.

pub mod client;
pub mod types;

pub use client::{Client, Error};
pub use types::{GameDetail, GridAuthor, GridsPage, ImageData};
