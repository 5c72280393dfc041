//! Append-only JSONL journal of successful snapshots, one file per index per
//! US/Eastern trading day.

use std::path::{Path, PathBuf};

use chrono_tz::US::Eastern;
use gamma_core::Snapshot;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SnapshotJournal {
    dir: PathBuf,
}

impl SnapshotJournal {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `dashboard_snapshots_<index>_<YYYYMMDD>.jsonl` for the snapshot's ET date.
    #[must_use]
    pub fn path_for(&self, snapshot: &Snapshot) -> PathBuf {
        let day = snapshot.timestamp.with_timezone(&Eastern).format("%Y%m%d");
        self.dir.join(format!(
            "dashboard_snapshots_{}_{day}.jsonl",
            snapshot.index.to_lowercase()
        ))
    }

    /// Appends one compact JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub async fn append(&self, snapshot: &Snapshot) -> Result<PathBuf, JournalError> {
        let path = self.path_for(snapshot);
        let mut line = serde_json::to_vec(snapshot)?;
        line.push(b'\n');

        let io_err = |source| JournalError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(&line).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(path)
    }
}
