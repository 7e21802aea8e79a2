use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use clap::ValueEnum;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::invariants::{Ip, Url};
use crate::models::LogEntry;

const COL_URL: &str = "URL";
const COL_IP: &str = "IP";
const COL_TIMESTAMP: &str = "timeStamp";
const COL_DURATION: &str = "timeSpent";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ParsePolicy {
    /// Abort the whole ingestion on the first malformed row.
    Reject,
    /// Drop malformed rows with a warning and keep going.
    Skip,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("missing value for column `{0}`")]
    MissingColumn(&'static str),
    #[error("empty value for column `{0}`")]
    EmptyColumn(&'static str),
    #[error("unparseable timestamp `{0}`")]
    BadTimestamp(String),
    #[error("unparseable duration `{0}`")]
    BadDuration(String),
    #[error("negative duration {0}")]
    NegativeDuration(i64),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read `{}`: {source}", .path.display())]
    SourceRead { path: PathBuf, source: io::Error },
    #[error("source has no header row")]
    EmptySource,
    #[error("source header has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("line {line}: {kind}")]
    Row { line: usize, kind: RowError },
}

#[derive(Debug)]
pub struct IngestReport {
    pub entries: Vec<LogEntry>,
    pub skipped: usize,
}

/// Single forward pass over the delimited source: header first, then one
/// entry per non-empty row. Nothing is emitted unless the whole pass
/// succeeds under the given policy.
pub async fn read_source(path: &Path, policy: ParsePolicy) -> Result<IngestReport, IngestError> {
    let read_err = |source| IngestError::SourceRead {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).await.map_err(read_err)?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next_line()
        .await
        .map_err(read_err)?
        .ok_or(IngestError::EmptySource)?;
    let columns = Columns::from_header(&header)?;

    let mut entries = Vec::new();
    let mut skipped = 0;
    let mut line_no = 1;
    while let Some(line) = lines.next_line().await.map_err(read_err)? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match columns.parse_row(&line) {
            Ok(entry) => entries.push(entry),
            Err(kind) => match policy {
                ParsePolicy::Reject => return Err(IngestError::Row { line: line_no, kind }),
                ParsePolicy::Skip => {
                    warn!(line = line_no, error = %kind, "skipping malformed row");
                    skipped += 1;
                }
            },
        }
    }
    Ok(IngestReport { entries, skipped })
}

/// Accepted instant grammar: RFC 3339 (any offset), `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC), or a bare `YYYY-MM-DD` (midnight UTC). The result is
/// truncated to whole seconds.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc).trunc_subsecs(0));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

fn parse_leading_i64(text: &str) -> Option<i64> {
    let text = text.trim();
    let prefix_len = text
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    text[..prefix_len].parse().ok()
}

struct Columns {
    url: usize,
    ip: usize,
    timestamp: usize,
    duration: usize,
}

impl Columns {
    fn from_header(line: &str) -> Result<Self, IngestError> {
        let names: Vec<&str> = line.split(',').map(str::trim).collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| *n == name)
                .ok_or(IngestError::MissingColumn(name))
        };
        Ok(Self {
            url: find(COL_URL)?,
            ip: find(COL_IP)?,
            timestamp: find(COL_TIMESTAMP)?,
            duration: find(COL_DURATION)?,
        })
    }

    fn parse_row(&self, line: &str) -> Result<LogEntry, RowError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |idx: usize, name: &'static str| {
            fields.get(idx).copied().ok_or(RowError::MissingColumn(name))
        };

        let url: Url = field(self.url, COL_URL)?
            .parse()
            .map_err(|_| RowError::EmptyColumn(COL_URL))?;
        let ip: Ip = field(self.ip, COL_IP)?
            .parse()
            .map_err(|_| RowError::EmptyColumn(COL_IP))?;

        let raw_ts = field(self.timestamp, COL_TIMESTAMP)?;
        let timestamp =
            parse_instant(raw_ts).ok_or_else(|| RowError::BadTimestamp(raw_ts.to_string()))?;

        let raw_duration = field(self.duration, COL_DURATION)?;
        let duration_secs = parse_leading_i64(raw_duration)
            .ok_or_else(|| RowError::BadDuration(raw_duration.to_string()))?;
        if duration_secs < 0 {
            return Err(RowError::NegativeDuration(duration_secs));
        }

        Ok(LogEntry {
            url,
            ip,
            timestamp,
            duration_secs,
        })
    }
}
