use async_trait::async_trait;
use uuid::Uuid;

use crate::events::{Attendee, DashboardRsvp, Event, Rsvp};

use super::Result;

/// Repository for events, attendees and RSVPs.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Gets the events created by a user, ordered by start time ascending,
    /// optionally limited to the first `limit`.
    async fn events_for_user(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<Event>>;

    /// Gets one event, only if it was created by `user_id`.
    async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Event>>;

    /// Creates a new event.
    async fn create_event(&self, event: &Event) -> Result<()>;

    /// Gets the RSVPs of an event.
    async fn rsvps_for_event(&self, event_id: Uuid) -> Result<Vec<Rsvp>>;

    /// Gets every RSVP to events created by `user_id`, joined with its
    /// attendee and event.
    async fn rsvps_for_user_events(&self, user_id: Uuid) -> Result<Vec<DashboardRsvp>>;

    /// Creates a new attendee.
    async fn create_attendee(&self, attendee: &Attendee) -> Result<()>;

    /// Creates a new RSVP. The event and attendee must exist.
    async fn create_rsvp(&self, rsvp: &Rsvp) -> Result<()>;
}
