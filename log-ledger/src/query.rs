use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::models::canonical_ts;
use crate::store::{Store, StoreError};

/// Distinct `url` values across the store, ascending.
pub async fn all_urls(store: &Store) -> Result<Vec<String>, StoreError> {
    store
        .with_conn("all-urls", |conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT url FROM entries ORDER BY url ASC")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await
}

/// `ip` of every entry for the given `url`, ascending by `ip`. One row per
/// matching entry.
pub async fn ips_for_url(store: &Store, url: &str) -> Result<Vec<String>, StoreError> {
    let url = url.to_owned();
    store
        .with_conn("ips-for-url", move |conn| {
            let mut stmt =
                conn.prepare("SELECT ip FROM entries WHERE url = ?1 ORDER BY ip ASC")?;
            let rows = stmt
                .query_map(params![url], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await
}

/// `url` of every entry whose timestamp lies in the closed interval
/// `[start, end]`, ascending by `url`.
pub async fn urls_in_range(
    store: &Store,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<String>, StoreError> {
    let (start, end) = (canonical_ts(&start), canonical_ts(&end));
    store
        .with_conn("urls-in-range", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT url FROM entries
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY url ASC",
            )?;
            let rows = stmt
                .query_map(params![start, end], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await
}

/// `url` of every entry recorded for the given `ip`, ascending by `url`.
pub async fn urls_for_ip(store: &Store, ip: &str) -> Result<Vec<String>, StoreError> {
    let ip = ip.to_owned();
    store
        .with_conn("urls-for-ip", move |conn| {
            let mut stmt =
                conn.prepare("SELECT url FROM entries WHERE ip = ?1 ORDER BY url ASC")?;
            let rows = stmt
                .query_map(params![ip], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::LogEntry;
    use asserting::prelude::*;
    use std::time::Duration;

    fn entry(url: &str, ip: &str, ts: &str, secs: i64) -> LogEntry {
        LogEntry {
            url: url.parse().unwrap(),
            ip: ip.parse().unwrap(),
            timestamp: crate::ingest::parse_instant(ts).unwrap(),
            duration_secs: secs,
        }
    }

    async fn seeded_store(dir: &tempfile::TempDir) -> Store {
        let store = Store::new(dir.path().join("entries.db"), Duration::from_secs(10));
        store
            .insert_batch(vec![
                entry("/a", "1.1.1.1", "2024-01-01T00:00:00Z", 10),
                entry("/a", "1.1.1.2", "2024-01-02T00:00:00Z", 20),
                entry("/b", "1.1.1.1", "2024-01-01T12:00:00Z", 5),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn all_urls_is_distinct_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;
        let urls = all_urls(&store).await.unwrap();
        assert_that!(urls).is_equal_to(vec!["/a".to_string(), "/b".to_string()]);
    }

    #[tokio::test]
    async fn ips_for_url_sorts_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;
        let ips = ips_for_url(&store, "/a").await.unwrap();
        assert_that!(ips).is_equal_to(vec!["1.1.1.1".to_string(), "1.1.1.2".to_string()]);
    }

    #[tokio::test]
    async fn ips_for_url_unknown_url_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;
        let ips = ips_for_url(&store, "/nope").await.unwrap();
        assert!(ips.is_empty());
    }

    #[tokio::test]
    async fn urls_in_range_includes_both_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;

        // start boundary hits /a exactly, end boundary hits /b exactly
        let start = crate::ingest::parse_instant("2024-01-01T00:00:00Z").unwrap();
        let end = crate::ingest::parse_instant("2024-01-01T12:00:00Z").unwrap();
        let urls = urls_in_range(&store, start, end).await.unwrap();
        assert_that!(urls).is_equal_to(vec!["/a".to_string(), "/b".to_string()]);
    }

    #[tokio::test]
    async fn urls_in_range_excludes_entries_outside() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;

        let start = crate::ingest::parse_instant("2024-01-01T00:00:00Z").unwrap();
        let end = crate::ingest::parse_instant("2024-01-01T23:59:59Z").unwrap();
        let urls = urls_in_range(&store, start, end).await.unwrap();
        // the 2024-01-02 visit to /a falls outside
        assert_that!(urls).is_equal_to(vec!["/a".to_string(), "/b".to_string()]);
    }

    #[tokio::test]
    async fn urls_for_ip_returns_one_row_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;
        let urls = urls_for_ip(&store, "1.1.1.1").await.unwrap();
        assert_that!(urls).is_equal_to(vec!["/a".to_string(), "/b".to_string()]);
    }
}
