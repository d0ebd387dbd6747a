//! SQLite repository implementation.
//!
//! Implements `EventRepository` from `evently_core::storage` using SQLite.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use evently_core::events::{Attendee, DashboardRsvp, Event, Rsvp};
use evently_core::storage::{EventRepository, RepositoryError, Result};

use super::conversions::{row_to_dashboard_rsvp, row_to_event, row_to_rsvp, sql_limit};
use super::error::map_tokio_rusqlite_error;
use super::schema;
use crate::sqlite::{format_datetime, wrap_err};

/// SQLite-based event store.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl EventRepository for SqliteRepository {
    async fn events_for_user(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<Event>> {
        let user_id_str = user_id.to_string();
        let limit = sql_limit(limit);

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_EVENTS_FOR_USER)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params![user_id_str, limit], row_to_event)
                    .map_err(wrap_err)?;

                let mut events = Vec::new();
                for row_result in rows {
                    events.push(row_result.map_err(wrap_err)?);
                }
                Ok(events)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Event", user_id.to_string()))
    }

    async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Event>> {
        let user_id_str = user_id.to_string();
        let event_id_str = event_id.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(
                    schema::SELECT_EVENT_FOR_USER,
                    [&event_id_str, &user_id_str],
                    row_to_event,
                )
                .optional()
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Event", event_id.to_string()))
    }

    async fn create_event(&self, event: &Event) -> Result<()> {
        let id = event.id.to_string();
        let name = event.name.clone();
        let start_on = format_datetime(&event.start_on);
        let status = event.status.as_str();
        let is_private = event.is_private;
        let created_by_id = event.created_by_id.to_string();
        let created_at = format_datetime(&event.created_at);
        let event_id = event.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_EVENT,
                    rusqlite::params![
                        id,
                        name,
                        start_on,
                        status,
                        is_private,
                        created_by_id,
                        created_at
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Event", event_id))
    }

    async fn rsvps_for_event(&self, event_id: Uuid) -> Result<Vec<Rsvp>> {
        let event_id_str = event_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_RSVPS_FOR_EVENT)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&event_id_str], row_to_rsvp)
                    .map_err(wrap_err)?;

                let mut rsvps = Vec::new();
                for row_result in rows {
                    rsvps.push(row_result.map_err(wrap_err)?);
                }
                Ok(rsvps)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Rsvp", event_id.to_string()))
    }

    async fn rsvps_for_user_events(&self, user_id: Uuid) -> Result<Vec<DashboardRsvp>> {
        let user_id_str = user_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_RSVPS_FOR_USER_EVENTS)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&user_id_str], row_to_dashboard_rsvp)
                    .map_err(wrap_err)?;

                let mut rsvps = Vec::new();
                for row_result in rows {
                    rsvps.push(row_result.map_err(wrap_err)?);
                }
                Ok(rsvps)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Rsvp", user_id.to_string()))
    }

    async fn create_attendee(&self, attendee: &Attendee) -> Result<()> {
        let id = attendee.id.to_string();
        let name = attendee.name.clone();
        let email = attendee.email.clone();
        let attendee_id = attendee.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(schema::INSERT_ATTENDEE, rusqlite::params![id, name, email])
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Attendee", attendee_id))
    }

    async fn create_rsvp(&self, rsvp: &Rsvp) -> Result<()> {
        let id = rsvp.id.to_string();
        let event_id = rsvp.event_id.to_string();
        let attendee_id = rsvp.attendee_id.to_string();
        let status = rsvp.status.as_str();
        let rsvp_id = rsvp.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_RSVP,
                    rusqlite::params![id, event_id, attendee_id, status],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Rsvp", rsvp_id))
    }
}
