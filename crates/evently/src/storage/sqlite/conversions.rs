//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use rusqlite::Row;

use evently_core::events::{Attendee, DashboardRsvp, Event, EventStatus, EventSummary, Rsvp, RsvpStatus};
use evently_core::storage::RepositoryError;

use crate::sqlite::{conversion_error, parse_datetime, parse_uuid};

/// Convert a SQLite row to an Event.
///
/// Expected columns: id, name, start_on, status, is_private, created_by_id, created_at
pub fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let start_on: String = row.get(2)?;
    let status: String = row.get(3)?;
    let is_private: bool = row.get(4)?;
    let created_by_id: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Event {
        id: parse_uuid(0, &id)?,
        name,
        start_on: parse_datetime(2, &start_on)?,
        status: parse_event_status(3, &status)?,
        is_private,
        created_by_id: parse_uuid(5, &created_by_id)?,
        created_at: parse_datetime(6, &created_at)?,
    })
}

/// Convert a SQLite row to an Rsvp, reading columns from `offset`.
///
/// Expected columns: id, event_id, attendee_id, status
fn rsvp_at(row: &Row, offset: usize) -> rusqlite::Result<Rsvp> {
    let id: String = row.get(offset)?;
    let event_id: String = row.get(offset + 1)?;
    let attendee_id: String = row.get(offset + 2)?;
    let status: String = row.get(offset + 3)?;

    Ok(Rsvp {
        id: parse_uuid(offset, &id)?,
        event_id: parse_uuid(offset + 1, &event_id)?,
        attendee_id: parse_uuid(offset + 2, &attendee_id)?,
        status: parse_rsvp_status(offset + 3, &status)?,
    })
}

pub fn row_to_rsvp(row: &Row) -> rusqlite::Result<Rsvp> {
    rsvp_at(row, 0)
}

/// Convert a joined row to a DashboardRsvp.
///
/// Expected columns: rsvp (id, event_id, attendee_id, status),
/// attendee (id, name, email), event (id, name, start_on, status)
pub fn row_to_dashboard_rsvp(row: &Row) -> rusqlite::Result<DashboardRsvp> {
    let rsvp = rsvp_at(row, 0)?;

    let attendee_id: String = row.get(4)?;
    let attendee = Attendee {
        id: parse_uuid(4, &attendee_id)?,
        name: row.get(5)?,
        email: row.get(6)?,
    };

    let event_id: String = row.get(7)?;
    let start_on: String = row.get(9)?;
    let status: String = row.get(10)?;
    let event = EventSummary {
        id: parse_uuid(7, &event_id)?,
        name: row.get(8)?,
        start_on: parse_datetime(9, &start_on)?,
        status: parse_event_status(10, &status)?,
    };

    Ok(DashboardRsvp {
        rsvp,
        attendee,
        event,
    })
}

fn parse_event_status(column: usize, s: &str) -> rusqlite::Result<EventStatus> {
    EventStatus::parse(s).ok_or_else(|| {
        conversion_error(
            column,
            RepositoryError::InvalidData(format!("Unknown event status: {s}")),
        )
    })
}

fn parse_rsvp_status(column: usize, s: &str) -> rusqlite::Result<RsvpStatus> {
    RsvpStatus::parse(s).ok_or_else(|| {
        conversion_error(
            column,
            RepositoryError::InvalidData(format!("Unknown RSVP status: {s}")),
        )
    })
}

/// SQLite LIMIT value; negative means unlimited.
pub fn sql_limit(limit: Option<usize>) -> i64 {
    limit
        .and_then(|limit| i64::try_from(limit).ok())
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_status() {
        assert_eq!(parse_event_status(0, "live").unwrap(), EventStatus::Live);
        assert!(parse_event_status(0, "archived").is_err());
    }

    #[test]
    fn test_parse_rsvp_status() {
        assert_eq!(
            parse_rsvp_status(0, "not-going").unwrap(),
            RsvpStatus::NotGoing
        );
        assert!(parse_rsvp_status(0, "NotGoing").is_err());
    }

    #[test]
    fn test_sql_limit() {
        assert_eq!(sql_limit(Some(5)), 5);
        assert_eq!(sql_limit(None), -1);
    }
}
