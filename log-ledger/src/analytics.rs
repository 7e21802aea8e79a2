use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::invariants::Day;
use crate::models::canonical_ts;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlDuration {
    pub url: String,
    pub total_duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlVisits {
    pub url: String,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyVisits {
    pub url: String,
    pub day: Day,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpStats {
    pub ip: String,
    pub visits: i64,
    pub total_duration: i64,
}

/// Duration spent per `url`, heaviest first. Ties break ascending by `url`
/// so reports are deterministic.
pub async fn total_duration_by_url(store: &Store) -> Result<Vec<UrlDuration>, StoreError> {
    store
        .with_conn("total-duration-by-url", |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, SUM(duration_secs) AS total_duration
                 FROM entries
                 GROUP BY url
                 ORDER BY total_duration DESC, url ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UrlDuration {
                        url: row.get(0)?,
                        total_duration: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
}

/// Visit count per `url`, most visited first, ties ascending by `url`.
pub async fn visit_count_by_url(store: &Store) -> Result<Vec<UrlVisits>, StoreError> {
    store
        .with_conn("visit-count-by-url", |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, COUNT(*) AS visits
                 FROM entries
                 GROUP BY url
                 ORDER BY visits DESC, url ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UrlVisits {
                        url: row.get(0)?,
                        visits: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
}

/// Visits per `(url, calendar day)` over the closed interval `[start, end]`,
/// ascending by `url`, then busiest day first.
pub async fn visits_per_day(
    store: &Store,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DailyVisits>, StoreError> {
    let (start, end) = (canonical_ts(&start), canonical_ts(&end));
    store
        .with_conn("visits-per-day", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, date(timestamp) AS day, COUNT(*) AS visits
                 FROM entries
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 GROUP BY url, day
                 ORDER BY url ASC, visits DESC, day ASC",
            )?;
            let rows = stmt
                .query_map(params![start, end], |row| {
                    Ok(DailyVisits {
                        url: row.get(0)?,
                        day: row.get(1)?,
                        visits: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
}

/// Visit count and duration sum per `ip`, ascending by `ip`. The count and
/// duration tie-breaks only matter if the grouping key ever stops being
/// unique, but the ordering contract is kept in place.
pub async fn stats_by_ip(store: &Store) -> Result<Vec<IpStats>, StoreError> {
    store
        .with_conn("stats-by-ip", |conn| {
            let mut stmt = conn.prepare(
                "SELECT ip, COUNT(*) AS visits, SUM(duration_secs) AS total_duration
                 FROM entries
                 GROUP BY ip
                 ORDER BY ip ASC, visits DESC, total_duration DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(IpStats {
                        ip: row.get(0)?,
                        visits: row.get(1)?,
                        total_duration: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
}
