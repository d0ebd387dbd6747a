use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Draft,
    Live,
    Started,
    Ended,
    Canceled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Live => "live",
            EventStatus::Started => "started",
            EventStatus::Ended => "ended",
            EventStatus::Canceled => "canceled",
        }
    }

    /// Parses the storage representation of a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "live" => Some(EventStatus::Live),
            "started" => Some(EventStatus::Started),
            "ended" => Some(EventStatus::Ended),
            "canceled" => Some(EventStatus::Canceled),
            _ => None,
        }
    }
}

/// An attendee's answer to an event invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    #[default]
    NotGoing,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Going => "going",
            RsvpStatus::Maybe => "maybe",
            RsvpStatus::NotGoing => "not-going",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "going" => Some(RsvpStatus::Going),
            "maybe" => Some(RsvpStatus::Maybe),
            "not-going" => Some(RsvpStatus::NotGoing),
            _ => None,
        }
    }
}

/// An event created by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub start_on: DateTime<Utc>,
    pub status: EventStatus,
    pub is_private: bool,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a draft event owned by `created_by_id`.
    pub fn new(created_by_id: Uuid, name: impl Into<String>, start_on: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_on,
            status: EventStatus::Draft,
            is_private: false,
            created_by_id,
            created_at: Utc::now(),
        }
    }

    /// Sets a specific ID for this event (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    /// Returns the columns shown in dashboard listings.
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            name: self.name.clone(),
            start_on: self.start_on,
            status: self.status,
        }
    }
}

/// The subset of an event shown in dashboard slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub start_on: DateTime<Utc>,
    pub status: EventStatus,
}

/// A person who can answer invitations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl Attendee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// An attendee's answer for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: Uuid,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub status: RsvpStatus,
}

impl Rsvp {
    pub fn new(event_id: Uuid, attendee_id: Uuid, status: RsvpStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            attendee_id,
            status,
        }
    }
}

/// An event in the dashboard's latest-events slot, with its RSVPs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEvent {
    #[serde(flatten)]
    pub event: EventSummary,
    pub rsvps: Vec<Rsvp>,
}

/// A row of the dashboard's RSVP slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRsvp {
    pub rsvp: Rsvp,
    pub attendee: Attendee,
    pub event: EventSummary,
}
