//! Sync error types.

use covered_catalog::StoreError;

/// Errors produced while syncing covers.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The provider has no data for the game. Terminal.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other provider failure. Retried on the next tick.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Returns `true` for the terminal "provider has no such game" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

impl From<covered_steamgriddb::Error> for SyncError {
    fn from(e: covered_steamgriddb::Error) -> Self {
        if e.is_not_found() {
            SyncError::NotFound(e.to_string())
        } else {
            SyncError::Provider(e.to_string())
        }
    }
}
