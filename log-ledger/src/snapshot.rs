use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::models::LogEntry;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot write snapshot `{}`: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot read snapshot `{}`: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot encode snapshot: {0}")]
    Encode(serde_json::Error),
    #[error("snapshot `{}` is corrupt: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Serialize the full entry sequence to `path`, replacing any prior
/// snapshot. There are no partial or append semantics.
pub async fn write(path: &Path, entries: &[LogEntry]) -> Result<(), SnapshotError> {
    let bytes = serde_json::to_vec_pretty(entries).map_err(SnapshotError::Encode)?;
    fs::write(path, bytes).await.map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn read(path: &Path) -> Result<Vec<LogEntry>, SnapshotError> {
    let bytes = fs::read(path).await.map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
