//! SQLite schema definitions and SQL query constants.
//!
//! This module contains all SQL statements used by the SQLite repository,
//! following the Functional Core pattern - pure data, no I/O.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = ON;

-- Events table
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    start_on TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    is_private INTEGER NOT NULL DEFAULT 0,
    created_by_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Attendees table
CREATE TABLE IF NOT EXISTS attendees (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
);

-- RSVPs table
CREATE TABLE IF NOT EXISTS rsvps (
    id TEXT PRIMARY KEY,
    event_id TEXT NOT NULL,
    attendee_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'not-going',
    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
    FOREIGN KEY (attendee_id) REFERENCES attendees(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_events_created_by ON events(created_by_id, start_on);
CREATE INDEX IF NOT EXISTS idx_rsvps_event ON rsvps(event_id);
"#;

// ============================================================================
// Event queries
// ============================================================================

pub const INSERT_EVENT: &str = r#"
INSERT INTO events (id, name, start_on, status, is_private, created_by_id, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub const SELECT_EVENT_FOR_USER: &str = r#"
SELECT id, name, start_on, status, is_private, created_by_id, created_at
FROM events
WHERE id = ?1 AND created_by_id = ?2
"#;

/// A negative limit means no limit in SQLite.
pub const SELECT_EVENTS_FOR_USER: &str = r#"
SELECT id, name, start_on, status, is_private, created_by_id, created_at
FROM events
WHERE created_by_id = ?1
ORDER BY start_on ASC, id ASC
LIMIT ?2
"#;

// ============================================================================
// Attendee queries
// ============================================================================

pub const INSERT_ATTENDEE: &str = r#"
INSERT INTO attendees (id, name, email)
VALUES (?1, ?2, ?3)
"#;

// ============================================================================
// RSVP queries
// ============================================================================

pub const INSERT_RSVP: &str = r#"
INSERT INTO rsvps (id, event_id, attendee_id, status)
VALUES (?1, ?2, ?3, ?4)
"#;

pub const SELECT_RSVPS_FOR_EVENT: &str = r#"
SELECT id, event_id, attendee_id, status
FROM rsvps
WHERE event_id = ?1
ORDER BY id ASC
"#;

pub const SELECT_RSVPS_FOR_USER_EVENTS: &str = r#"
SELECT r.id, r.event_id, r.attendee_id, r.status,
       a.id, a.name, a.email,
       e.id, e.name, e.start_on, e.status
FROM rsvps r
INNER JOIN attendees a ON a.id = r.attendee_id
INNER JOIN events e ON e.id = r.event_id
WHERE e.created_by_id = ?1
ORDER BY e.start_on ASC, e.id ASC, r.id ASC
"#;
