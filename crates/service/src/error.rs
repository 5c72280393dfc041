use gamma_core::{RefreshError, SnapshotError};
use thiserror::Error;

/// Error from an explicit `trigger_refresh` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),
}
