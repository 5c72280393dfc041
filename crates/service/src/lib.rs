//! Snapshot cache coordination for the gamma-exposure engine.
//!
//! - [`SnapshotCoordinator`]: per-index cache with single-flight refresh
//! - [`RefreshScheduler`]: periodic refresh loops, one per index
//! - [`SnapshotPipeline`]: the pure flatten → GEX → strategy computation
//! - [`SnapshotJournal`]: optional append-only JSONL history

pub mod coordinator;
pub mod debug_ring;
pub mod error;
pub mod history;
pub mod journal;
pub mod pipeline;
pub mod report;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use coordinator::{CoordinatorBuilder, SnapshotCoordinator, DEBUG_ERROR_VIEW, DEBUG_EVENT_VIEW};
pub use debug_ring::{DebugEventRing, RuleCounter, RuleStats};
pub use error::ServiceError;
pub use history::SnapshotHistory;
pub use journal::{JournalError, SnapshotJournal};
pub use pipeline::SnapshotPipeline;
pub use report::{
    DebugReport, HealthReport, IndexHealth, LogPointers, RefreshState, ServiceStatus,
    SnapshotSummary,
};
pub use scheduler::RefreshScheduler;
