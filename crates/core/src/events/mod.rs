mod names;
mod types;

pub use names::{event_name, ADJECTIVES, NOUNS};
pub use types::{
    Attendee, DashboardEvent, DashboardRsvp, Event, EventStatus, EventSummary, Rsvp, RsvpStatus,
};
