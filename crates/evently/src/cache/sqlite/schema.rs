//! SQLite schema definitions and SQL query constants for the durable cache.

/// SQL statement to create the cache tables.
pub const CREATE_TABLES: &str = r#"
-- Memoized entries
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT,
    labels TEXT NOT NULL
);

-- Tag index (many-to-many between tags and entries)
CREATE TABLE IF NOT EXISTS cache_tags (
    tag TEXT NOT NULL,
    key TEXT NOT NULL,
    PRIMARY KEY (tag, key)
);

CREATE INDEX IF NOT EXISTS idx_cache_tags_key ON cache_tags(key);
"#;

pub const SELECT_ENTRY: &str = r#"
SELECT key, value, created_at, expires_at, labels
FROM cache_entries
WHERE key = ?1
"#;

pub const SELECT_TAGS_FOR_KEY: &str = r#"
SELECT tag
FROM cache_tags
WHERE key = ?1
ORDER BY tag ASC
"#;

pub const SELECT_KEYS_FOR_TAG: &str = r#"
SELECT key
FROM cache_tags
WHERE tag = ?1
ORDER BY key ASC
"#;

pub const UPSERT_ENTRY: &str = r#"
INSERT OR REPLACE INTO cache_entries (key, value, created_at, expires_at, labels)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const INSERT_TAG: &str = r#"
INSERT OR IGNORE INTO cache_tags (tag, key)
VALUES (?1, ?2)
"#;

pub const DELETE_ENTRY: &str = r#"
DELETE FROM cache_entries
WHERE key = ?1
"#;

pub const DELETE_TAGS_FOR_KEY: &str = r#"
DELETE FROM cache_tags
WHERE key = ?1
"#;

pub const CLEAR_ALL: &str = r#"
BEGIN;
DELETE FROM cache_tags;
DELETE FROM cache_entries;
COMMIT;
"#;
