//! SQLite-backed durable cache.
//!
//! Entries and the tag index are stored in two tables and every mutation
//! runs inside a single transaction, so concurrent readers see either the
//! old state or the new one. Entries survive process restarts when the
//! cache is opened on a file.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use tokio_rusqlite::Connection;

use evently_core::cache::{normalize_tags, Cache, CacheEntry, CacheError, CacheKey, Result};

use super::schema;
use crate::sqlite::{conversion_error, format_datetime, parse_datetime, wrap_err};

/// Maps a tokio_rusqlite error to a CacheError.
fn map_err(err: tokio_rusqlite::Error) -> CacheError {
    match err {
        tokio_rusqlite::Error::Close(_) => {
            CacheError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        other => CacheError::OperationFailed(other.to_string()),
    }
}

/// Convert a SQLite row to a CacheEntry (without its tags).
///
/// Expected columns: key, value, created_at, expires_at, labels
fn row_to_entry(row: &Row) -> rusqlite::Result<CacheEntry> {
    let key: String = row.get(0)?;
    let value: Vec<u8> = row.get(1)?;
    let created_at: String = row.get(2)?;
    let expires_at: Option<String> = row.get(3)?;
    let labels: String = row.get(4)?;

    Ok(CacheEntry {
        key: CacheKey::from_raw(key),
        value,
        tags: BTreeSet::new(),
        created_at: parse_datetime(2, &created_at)?,
        expires_at: expires_at
            .as_deref()
            .map(|s| parse_datetime(3, s))
            .transpose()?,
        labels: serde_json::from_str(&labels).map_err(|e| conversion_error(4, e))?,
    })
}

fn load_tags(conn: &rusqlite::Connection, key: &str) -> rusqlite::Result<BTreeSet<String>> {
    let mut stmt = conn.prepare(schema::SELECT_TAGS_FOR_KEY)?;
    let rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
    rows.collect()
}

fn load_keys(conn: &rusqlite::Connection, tag: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(schema::SELECT_KEYS_FOR_TAG)?;
    let rows = stmt.query_map([tag], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// Removes an entry and all of its tag memberships. Returns true if an
/// entry was removed.
fn remove_entry(conn: &rusqlite::Connection, key: &str) -> rusqlite::Result<bool> {
    conn.execute(schema::DELETE_TAGS_FOR_KEY, [key])?;
    Ok(conn.execute(schema::DELETE_ENTRY, [key])? > 0)
}

fn get_entry(
    conn: &rusqlite::Connection,
    key: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<Option<CacheEntry>> {
    let Some(mut entry) = conn
        .query_row(schema::SELECT_ENTRY, [key], row_to_entry)
        .optional()?
    else {
        return Ok(None);
    };

    if entry.is_expired_at(now) {
        remove_entry(conn, key)?;
        return Ok(None);
    }

    entry.tags = load_tags(conn, key)?;
    Ok(Some(entry))
}

fn invalidate(conn: &rusqlite::Connection, tags: &[String]) -> rusqlite::Result<usize> {
    let mut evicted = 0;
    for tag in tags {
        for key in load_keys(conn, tag)? {
            if remove_entry(conn, &key)? {
                evicted += 1;
            }
        }
    }
    Ok(evicted)
}

/// SQLite-based cache implementation.
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Opens (or creates) a file-based cache database.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a cache backed by an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(map_err)
    }
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let key = key.as_str().to_string();
        let now = Utc::now();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let entry = get_entry(&tx, &key, now).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(entry)
            })
            .await
            .map_err(map_err)
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let labels = serde_json::to_string(&entry.labels)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        let created_at = format_datetime(&entry.created_at);
        let expires_at = entry.expires_at.as_ref().map(format_datetime);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let key = entry.key.as_str();

                // Drop the previous entry's tag memberships before replacing it
                tx.execute(schema::DELETE_TAGS_FOR_KEY, [key])
                    .map_err(wrap_err)?;
                tx.execute(
                    schema::UPSERT_ENTRY,
                    rusqlite::params![key, entry.value, created_at, expires_at, labels],
                )
                .map_err(wrap_err)?;
                for tag in &entry.tags {
                    tx.execute(schema::INSERT_TAG, rusqlite::params![tag, key])
                        .map_err(wrap_err)?;
                }

                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(map_err)
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let key = key.as_str().to_string();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                remove_entry(&tx, &key).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(map_err)
    }

    async fn invalidate_tags(&self, tags: &[String]) -> Result<usize> {
        let tags = normalize_tags(tags);
        if tags.is_empty() {
            return Ok(0);
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let evicted = invalidate(&tx, &tags).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(evicted)
            })
            .await
            .map_err(map_err)
    }

    async fn tag_members(&self, tag: &str) -> Result<Vec<CacheKey>> {
        let tag = tag.to_string();

        self.conn
            .call(move |conn| {
                let keys = load_keys(conn, &tag).map_err(wrap_err)?;
                Ok(keys.into_iter().map(CacheKey::from_raw).collect())
            })
            .await
            .map_err(map_err)
    }

    async fn clear(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(schema::CLEAR_ALL).map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_raw(name)
    }

    fn entry(name: &str, value: &[u8], tags: &[&str]) -> CacheEntry {
        CacheEntry::new(key(name), value.to_vec()).with_tags(tags.iter().copied())
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("evently-cache-{}.db", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        let stored = entry("k1", b"[1,2]", &["events", "dashboard:events"])
            .with_labels(vec!["datacache".to_string(), "logid:events".to_string()]);

        cache.set(stored.clone()).await.unwrap();
        let loaded = cache.get(&key("k1")).await.unwrap().unwrap();

        assert_eq!(loaded.value, stored.value);
        assert_eq!(loaded.tags, stored.tags);
        assert_eq!(loaded.labels, stored.labels);
        assert_eq!(loaded.created_at, stored.created_at);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        assert!(cache.get(&key("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_tags() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();
        cache.set(entry("k2", b"2", &["events", "event"])).await.unwrap();
        cache.set(entry("k3", b"3", &["event"])).await.unwrap();

        let evicted = cache
            .invalidate_tags(&tags(&["events", "unknown", "events"]))
            .await
            .unwrap();

        assert_eq!(evicted, 2);
        assert!(cache.get(&key("k1")).await.unwrap().is_none());
        assert!(cache.get(&key("k2")).await.unwrap().is_none());
        assert!(cache.get(&key("k3")).await.unwrap().is_some());
        // k2 no longer dangles under its other tag
        assert_eq!(cache.tag_members("event").await.unwrap(), vec![key("k3")]);
        assert!(cache.tag_members("events").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_reindexes_tags() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        cache.set(entry("k1", b"first", &["old"])).await.unwrap();
        cache.set(entry("k1", b"second", &["new"])).await.unwrap();

        let loaded = cache.get(&key("k1")).await.unwrap().unwrap();
        assert_eq!(loaded.value, b"second".to_vec());
        assert!(cache.tag_members("old").await.unwrap().is_empty());
        assert_eq!(cache.tag_members("new").await.unwrap(), vec![key("k1")]);
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        let expired = entry("k1", b"1", &["events"])
            .with_created_at(Utc::now() - chrono::Duration::seconds(120))
            .with_ttl(Duration::from_secs(60));
        cache.set(expired).await.unwrap();

        assert!(cache.get(&key("k1")).await.unwrap().is_none());
        assert!(cache.tag_members("events").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();

        cache.delete(&key("k1")).await.unwrap();

        assert!(cache.get(&key("k1")).await.unwrap().is_none());
        assert!(cache.tag_members("events").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = SqliteCache::new_in_memory().await.unwrap();
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();

        cache.clear().await.unwrap();

        assert!(cache.get(&key("k1")).await.unwrap().is_none());
        assert!(cache.tag_members("events").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let path = temp_db_path();

        {
            let cache = SqliteCache::new(&path).await.unwrap();
            cache.set(entry("k1", b"persisted", &["events"])).await.unwrap();
        }

        let reopened = SqliteCache::new(&path).await.unwrap();
        let loaded = reopened.get(&key("k1")).await.unwrap().unwrap();
        assert_eq!(loaded.value, b"persisted".to_vec());

        // The tag index survives too
        assert_eq!(reopened.invalidate_tags(&tags(&["events"])).await.unwrap(), 1);
        assert!(reopened.get(&key("k1")).await.unwrap().is_none());

        let _ = std::fs::remove_file(&path);
    }
}
