use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::{AsRef, Display};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Display, AsRef, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub struct Url(String);

impl Url {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Url {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("url must not be empty".into());
        }
        Ok(Self(s.into()))
    }
}

impl TryFrom<String> for Url {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(
    Debug, Display, AsRef, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub struct Ip(String);

impl Ip {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Ip {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("ip must not be empty".into());
        }
        Ok(Self(s.into()))
    }
}

impl TryFrom<String> for Ip {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Calendar-day truncation of an instant, the per-day grouping key.
/// Textual form is `YYYY-MM-DD` in UTC.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Day(NaiveDate);

impl From<DateTime<Utc>> for Day {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.date_naive())
    }
}

impl FromStr for Day {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(NaiveDate::parse_from_str(s, "%Y-%m-%d")?))
    }
}

impl FromSql for Day {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: chrono::ParseError| FromSqlError::Other(Box::new(e)))
    }
}
