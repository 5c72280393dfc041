//! Error taxonomy for the refresh pipeline and the read path.
//!
//! Refresh failures never reach read callers: the coordinator records them
//! and keeps serving the last good snapshot. The only read-path error a
//! caller can see is [`SnapshotError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of one refresh cycle.
///
/// `Clone` so that a single in-flight result can be handed to every caller
/// joined on it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RefreshError {
    /// Bad or expired credentials. Not retried until corrected externally.
    #[error("upstream authentication failed: {0}")]
    UpstreamAuth(String),

    /// Network failure, timeout, rate limit or upstream 5xx.
    #[error("upstream temporarily unavailable: {0}")]
    UpstreamTransient(String),

    /// Payload shape the adapter could not interpret at all.
    #[error("malformed upstream data: {0}")]
    MalformedData(String),

    /// Pipeline computation failed.
    #[error("computation failed: {0}")]
    Computation(String),
}

impl RefreshError {
    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::UpstreamAuth(message.into())
    }

    /// Creates a transient upstream error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::UpstreamTransient(message.into())
    }

    /// Creates a malformed-payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedData(message.into())
    }

    /// Creates a computation error.
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }

    /// Short machine-readable label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamAuth(_) => "upstream_auth",
            Self::UpstreamTransient(_) => "upstream_transient",
            Self::MalformedData(_) => "malformed_data",
            Self::Computation(_) => "computation",
        }
    }

    /// True when the next scheduled cycle may succeed without intervention.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamTransient(_))
    }
}

/// Read-path error returned by `get_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// No refresh has ever succeeded for this index.
    #[error("no data yet for {index}")]
    NoDataYet {
        index: String,
        /// Last refresh error, if a refresh was attempted.
        last_error: Option<String>,
    },

    /// The index is not managed by this coordinator.
    #[error("unknown index: {index}")]
    UnknownIndex { index: String },
}
