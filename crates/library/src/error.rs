//! Library error types.

use covered_catalog::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("steam error: {0}")]
    Provider(#[from] covered_steam::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("unknown steam user: {0}")]
    UnknownUser(String),
}
