//! Demo data for the in-memory event store.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use evently_core::events::{Attendee, Event, EventStatus, Rsvp, RsvpStatus};
use evently_core::storage::{EventRepository, Result};

/// The user the demo events belong to.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x6f1e_57a2_0c4b_4d8e_9a3f_1b2c_3d4e_5f60);

/// Generates the demo user's events, starting relative to `now`.
pub fn generate_mock_events(user_id: Uuid, now: DateTime<Utc>) -> Vec<Event> {
    let event = |n: u128, name: &str, days: i64, status: EventStatus| {
        Event::new(user_id, name, now + Duration::days(days))
            .with_id(Uuid::from_u128(0xe0e0_0000_0000_0000_0000_0000_0000_0000 + n))
            .with_status(status)
    };

    vec![
        event(1, "Launch", -3, EventStatus::Ended),
        event(2, "Team Offsite", 2, EventStatus::Live),
        event(3, "Product Demo", 5, EventStatus::Live),
        event(4, "Quarterly Review", 9, EventStatus::Draft).with_private(true),
        event(5, "Hack Night", 14, EventStatus::Draft),
        event(6, "Holiday Party", 30, EventStatus::Canceled),
    ]
}

/// Generates the demo attendees.
pub fn generate_mock_attendees() -> Vec<Attendee> {
    [
        ("Ada Lovelace", "ada@example.com"),
        ("Alan Turing", "alan@example.com"),
        ("Grace Hopper", "grace@example.com"),
    ]
    .into_iter()
    .map(|(name, email)| Attendee::new(name, email))
    .collect()
}

/// Seeds `repository` with the demo user's events, attendees and RSVPs.
pub async fn seed(repository: &dyn EventRepository) -> Result<()> {
    let events = generate_mock_events(DEMO_USER_ID, Utc::now());
    let attendees = generate_mock_attendees();

    for event in &events {
        repository.create_event(event).await?;
    }
    for attendee in &attendees {
        repository.create_attendee(attendee).await?;
    }

    // Everyone answers the first three events, cycling through the answers
    let answers = [RsvpStatus::Going, RsvpStatus::Maybe, RsvpStatus::NotGoing];
    for (i, event) in events.iter().take(3).enumerate() {
        for (j, attendee) in attendees.iter().enumerate() {
            let status = answers[(i + j) % answers.len()];
            repository
                .create_rsvp(&Rsvp::new(event.id, attendee.id, status))
                .await?;
        }
    }

    tracing::info!(
        user_id = %DEMO_USER_ID,
        events = events.len(),
        attendees = attendees.len(),
        "Seeded demo data"
    );
    Ok(())
}
