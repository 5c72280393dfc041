use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// Refresh lifecycle event kinds recorded for the debug view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugEventKind {
    SnapshotRefreshOk,
    SnapshotRefreshSlow,
    SnapshotRefreshFailed,
}

impl DebugEventKind {
    #[must_use]
    pub fn level(self) -> EventLevel {
        match self {
            Self::SnapshotRefreshOk => EventLevel::Info,
            Self::SnapshotRefreshSlow => EventLevel::Warning,
            Self::SnapshotRefreshFailed => EventLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEvent {
    pub ts: DateTime<Utc>,
    pub level: EventLevel,
    pub kind: DebugEventKind,
    pub index: String,
    pub message: String,
    pub duration_ms: Option<f64>,
}

impl DebugEvent {
    #[must_use]
    pub fn new(
        ts: DateTime<Utc>,
        kind: DebugEventKind,
        index: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ts,
            level: kind.level(),
            kind,
            index: index.into(),
            message: message.into(),
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Warnings and errors are mirrored into the error ring.
    #[must_use]
    pub fn is_problem(&self) -> bool {
        matches!(self.level, EventLevel::Warning | EventLevel::Error)
    }
}
