//! In-memory repository implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use evently_core::events::{Attendee, DashboardRsvp, Event, Rsvp};
use evently_core::storage::{EventRepository, RepositoryError, Result};

/// In-memory event store.
///
/// Uses HashMaps wrapped in `Arc<RwLock<_>>` for thread-safe access.
/// Data is not persisted and will be lost when the repository is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    events: Arc<RwLock<HashMap<Uuid, Event>>>,
    attendees: Arc<RwLock<HashMap<Uuid, Attendee>>>,
    rsvps: Arc<RwLock<HashMap<Uuid, Rsvp>>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
            attendees: Arc::new(RwLock::new(HashMap::new())),
            rsvps: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl EventRepository for InMemoryRepository {
    async fn events_for_user(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        let mut owned: Vec<Event> = events
            .values()
            .filter(|e| e.created_by_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.start_on.cmp(&b.start_on).then(a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            owned.truncate(limit);
        }
        Ok(owned)
    }

    async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Event>> {
        let events = self.events.read().await;
        Ok(events
            .get(&event_id)
            .filter(|e| e.created_by_id == user_id)
            .cloned())
    }

    async fn create_event(&self, event: &Event) -> Result<()> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Event",
                id: event.id.to_string(),
            });
        }
        events.insert(event.id, event.clone());
        Ok(())
    }

    async fn rsvps_for_event(&self, event_id: Uuid) -> Result<Vec<Rsvp>> {
        let rsvps = self.rsvps.read().await;
        let mut matching: Vec<Rsvp> = rsvps
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);
        Ok(matching)
    }

    async fn rsvps_for_user_events(&self, user_id: Uuid) -> Result<Vec<DashboardRsvp>> {
        let events = self.events.read().await;
        let attendees = self.attendees.read().await;
        let rsvps = self.rsvps.read().await;

        let mut rows: Vec<(Event, DashboardRsvp)> = rsvps
            .values()
            .filter_map(|rsvp| {
                let event = events
                    .get(&rsvp.event_id)
                    .filter(|e| e.created_by_id == user_id)?;
                let attendee = attendees.get(&rsvp.attendee_id)?;
                Some((
                    event.clone(),
                    DashboardRsvp {
                        rsvp: rsvp.clone(),
                        attendee: attendee.clone(),
                        event: event.summary(),
                    },
                ))
            })
            .collect();

        rows.sort_by(|(a, ra), (b, rb)| {
            a.start_on
                .cmp(&b.start_on)
                .then(a.id.cmp(&b.id))
                .then(ra.rsvp.id.cmp(&rb.rsvp.id))
        });
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn create_attendee(&self, attendee: &Attendee) -> Result<()> {
        let mut attendees = self.attendees.write().await;
        if attendees.contains_key(&attendee.id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Attendee",
                id: attendee.id.to_string(),
            });
        }
        attendees.insert(attendee.id, attendee.clone());
        Ok(())
    }

    async fn create_rsvp(&self, rsvp: &Rsvp) -> Result<()> {
        if !self.events.read().await.contains_key(&rsvp.event_id) {
            return Err(RepositoryError::InvalidData(format!(
                "RSVP references unknown event {}",
                rsvp.event_id
            )));
        }
        if !self.attendees.read().await.contains_key(&rsvp.attendee_id) {
            return Err(RepositoryError::InvalidData(format!(
                "RSVP references unknown attendee {}",
                rsvp.attendee_id
            )));
        }

        let mut rsvps = self.rsvps.write().await;
        if rsvps.contains_key(&rsvp.id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Rsvp",
                id: rsvp.id.to_string(),
            });
        }
        rsvps.insert(rsvp.id, rsvp.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use evently_core::events::RsvpStatus;

    fn event_at(user_id: Uuid, name: &str, day: u32) -> Event {
        let start_on = Utc.with_ymd_and_hms(2024, 6, day, 18, 0, 0).unwrap();
        Event::new(user_id, name, start_on)
    }

    #[tokio::test]
    async fn test_create_and_get_event() {
        let repo = InMemoryRepository::new();
        let user_id = Uuid::new_v4();
        let event = event_at(user_id, "Launch", 1);

        repo.create_event(&event).await.unwrap();

        let found = repo.get_event(user_id, event.id).await.unwrap();
        assert_eq!(found, Some(event));
    }

    #[tokio::test]
    async fn test_get_event_is_scoped_to_creator() {
        let repo = InMemoryRepository::new();
        let event = event_at(Uuid::new_v4(), "Launch", 1);
        repo.create_event(&event).await.unwrap();

        let found = repo.get_event(Uuid::new_v4(), event.id).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_event() {
        let repo = InMemoryRepository::new();
        let event = event_at(Uuid::new_v4(), "Launch", 1);

        repo.create_event(&event).await.unwrap();
        let result = repo.create_event(&event).await;

        assert!(matches!(
            result,
            Err(RepositoryError::AlreadyExists {
                entity_type: "Event",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_events_for_user_ordered_and_limited() {
        let repo = InMemoryRepository::new();
        let user_id = Uuid::new_v4();
        let late = event_at(user_id, "Late", 20);
        let early = event_at(user_id, "Early", 2);
        let middle = event_at(user_id, "Middle", 10);
        let other = event_at(Uuid::new_v4(), "Other", 1);
        for event in [&late, &early, &middle, &other] {
            repo.create_event(event).await.unwrap();
        }

        let all = repo.events_for_user(user_id, None).await.unwrap();
        let names: Vec<&str> = all.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Early", "Middle", "Late"]);

        let limited = repo.events_for_user(user_id, Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, early.id);
    }

    #[tokio::test]
    async fn test_rsvp_requires_existing_event_and_attendee() {
        let repo = InMemoryRepository::new();
        let event = event_at(Uuid::new_v4(), "Launch", 1);
        let attendee = Attendee::new("Ada", "ada@example.com");

        let rsvp = Rsvp::new(event.id, attendee.id, RsvpStatus::Going);
        assert!(matches!(
            repo.create_rsvp(&rsvp).await,
            Err(RepositoryError::InvalidData(_))
        ));

        repo.create_event(&event).await.unwrap();
        repo.create_attendee(&attendee).await.unwrap();
        repo.create_rsvp(&rsvp).await.unwrap();

        assert_eq!(repo.rsvps_for_event(event.id).await.unwrap(), vec![rsvp]);
    }

    #[tokio::test]
    async fn test_rsvps_for_user_events_joins_attendee_and_event() {
        let repo = InMemoryRepository::new();
        let user_id = Uuid::new_v4();
        let mine = event_at(user_id, "Mine", 3);
        let theirs = event_at(Uuid::new_v4(), "Theirs", 3);
        let attendee = Attendee::new("Ada", "ada@example.com");
        repo.create_event(&mine).await.unwrap();
        repo.create_event(&theirs).await.unwrap();
        repo.create_attendee(&attendee).await.unwrap();

        let going = Rsvp::new(mine.id, attendee.id, RsvpStatus::Going);
        repo.create_rsvp(&going).await.unwrap();
        repo.create_rsvp(&Rsvp::new(theirs.id, attendee.id, RsvpStatus::Maybe))
            .await
            .unwrap();

        let rows = repo.rsvps_for_user_events(user_id).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rsvp, going);
        assert_eq!(rows[0].attendee, attendee);
        assert_eq!(rows[0].event, mine.summary());
    }

    #[tokio::test]
    async fn test_rsvps_for_user_events_ordered_by_event_start() {
        let repo = InMemoryRepository::new();
        let user_id = Uuid::new_v4();
        let later = event_at(user_id, "Later", 5);
        let sooner = Event::new(user_id, "Sooner", later.start_on - Duration::days(1));
        let attendee = Attendee::new("Ada", "ada@example.com");
        repo.create_event(&later).await.unwrap();
        repo.create_event(&sooner).await.unwrap();
        repo.create_attendee(&attendee).await.unwrap();
        repo.create_rsvp(&Rsvp::new(later.id, attendee.id, RsvpStatus::Going))
            .await
            .unwrap();
        repo.create_rsvp(&Rsvp::new(sooner.id, attendee.id, RsvpStatus::Maybe))
            .await
            .unwrap();

        let rows = repo.rsvps_for_user_events(user_id).await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.event.name.as_str()).collect();

        assert_eq!(names, vec!["Sooner", "Later"]);
    }
}
