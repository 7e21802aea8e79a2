use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, params};
use thiserror::Error;
use tokio::task;
use tokio::time::timeout;

use crate::models::{LogEntry, canonical_ts};

pub const INSERT_CHUNK_SIZE: usize = 500;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    ip TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    duration_secs INTEGER NOT NULL CHECK (duration_secs >= 0)
);
CREATE INDEX IF NOT EXISTS idx_entries_url ON entries (url);
CREATE INDEX IF NOT EXISTS idx_entries_ip ON entries (ip);
CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries (timestamp);
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(#[source] rusqlite::Error),
    #[error("store request failed: {0}")]
    Request(#[from] rusqlite::Error),
    #[error("store operation `{op}` exceeded its {}s deadline", .limit.as_secs())]
    Deadline { op: &'static str, limit: Duration },
    #[error("store worker failed: {0}")]
    Worker(#[from] task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub attempted: usize,
    pub inserted: usize,
    pub first_failure: Option<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub index: usize,
    pub message: String,
}

/// Handle to the entry store. Cheap to clone; every operation opens its own
/// connection, runs exactly one unit of work, and releases the connection on
/// all exit paths.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    op_deadline: Duration,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>, op_deadline: Duration) -> Self {
        Self {
            path: path.into(),
            op_deadline,
        }
    }

    /// Scoped connection acquisition: open, ensure schema, run `body` on a
    /// blocking worker, drop the connection. The caller's wait is bounded by
    /// the per-operation deadline.
    pub(crate) async fn with_conn<T, F>(&self, op: &'static str, body: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let work = task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(StoreError::Connection)?;
            conn.execute_batch(SCHEMA)?;
            body(&mut conn)
        });
        match timeout(self.op_deadline, work).await {
            Ok(joined) => joined?,
            Err(_) => Err(StoreError::Deadline {
                op,
                limit: self.op_deadline,
            }),
        }
    }

    /// Batch insert in chunks of [`INSERT_CHUNK_SIZE`], one transaction per
    /// chunk. A row failure rolls back only its own chunk; committed chunks
    /// stay persisted and the report says how far the batch got.
    pub async fn insert_batch(&self, entries: Vec<LogEntry>) -> Result<BulkReport, StoreError> {
        self.with_conn("insert-batch", move |conn| {
            let attempted = entries.len();
            let mut inserted = 0;
            let mut first_failure = None;
            for chunk in entries.chunks(INSERT_CHUNK_SIZE) {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(
                        "INSERT INTO entries (url, ip, timestamp, duration_secs)
                         VALUES (?1, ?2, ?3, ?4)",
                    )?;
                    for (offset, entry) in chunk.iter().enumerate() {
                        let outcome = stmt.execute(params![
                            entry.url.as_str(),
                            entry.ip.as_str(),
                            canonical_ts(&entry.timestamp),
                            entry.duration_secs,
                        ]);
                        if let Err(source) = outcome {
                            first_failure = Some(BulkFailure {
                                index: inserted + offset,
                                message: source.to_string(),
                            });
                            break;
                        }
                    }
                }
                if first_failure.is_some() {
                    // the failed chunk rolls back when `tx` drops
                    break;
                }
                tx.commit()?;
                inserted += chunk.len();
            }
            Ok(BulkReport {
                attempted,
                inserted,
                first_failure,
            })
        })
        .await
    }
}
