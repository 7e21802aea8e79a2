use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::invariants::{Ip, Url};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "URL")]
    pub url: Url,
    #[serde(rename = "IP")]
    pub ip: Ip,
    #[serde(rename = "timeStamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "timeSpent")]
    pub duration_secs: i64,
}

/// Canonical textual instant: RFC 3339 UTC at whole-second precision.
/// Lexicographic order of this form matches chronological order, which the
/// store's range filters rely on.
pub fn canonical_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
