//! Memoized dashboard queries and the mutations that invalidate them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use evently_core::cache::{
    LogLabel, MemoError, MemoOptions, DASHBOARD_EVENTS_TAG, DASHBOARD_RSVPS_TAG, EVENTS_TAG,
    EVENT_TAG,
};
use evently_core::events::{
    event_name, DashboardEvent, DashboardRsvp, Event, ADJECTIVES, NOUNS,
};
use evently_core::storage::{EventRepository, RepositoryError};

use crate::cache::{MemoCache, Memoized};

/// Number of events shown in the dashboard's latest-events slot.
pub const DASHBOARD_EVENTS_LIMIT: usize = 5;

pub type QueryResult<T> = std::result::Result<T, MemoError<RepositoryError>>;

/// Options shared by the dashboard producers.
fn dashboard_options<A>(tag: &'static str, revalidate: Option<Duration>) -> MemoOptions<A> {
    let mut options = MemoOptions::new()
        .with_persist(true)
        .with_revalidate_tags(move |_| vec![tag.to_string()])
        .with_suppress_warnings(true)
        .with_log([LogLabel::Datacache, LogLabel::Verbose])
        .with_logid(tag);
    options.revalidate = revalidate;
    options
}

async fn load_dashboard_events(
    repository: &dyn EventRepository,
    user_id: Uuid,
) -> Result<Vec<DashboardEvent>, RepositoryError> {
    let events = repository
        .events_for_user(user_id, Some(DASHBOARD_EVENTS_LIMIT))
        .await?;

    let mut dashboard = Vec::with_capacity(events.len());
    for event in events {
        let rsvps = repository.rsvps_for_event(event.id).await?;
        dashboard.push(DashboardEvent {
            event: event.summary(),
            rsvps,
        });
    }
    Ok(dashboard)
}

/// Read and write operations backing the dashboard.
///
/// Reads go through memoized producers; writes go to the repository and
/// then invalidate the tags of every read they affect.
#[derive(Clone)]
pub struct EventQueries {
    repository: Arc<dyn EventRepository>,
    cache: MemoCache,
    dashboard_events: Memoized<Uuid, Vec<DashboardEvent>, RepositoryError>,
    all_events: Memoized<Uuid, Vec<Event>, RepositoryError>,
    one_event: Memoized<(Uuid, Uuid), Option<Event>, RepositoryError>,
    dashboard_rsvps: Memoized<Uuid, Vec<DashboardRsvp>, RepositoryError>,
}

impl EventQueries {
    /// Memoizes the dashboard reads over `repository`.
    ///
    /// `revalidate` bounds the lifetime of every entry; `None` keeps entries
    /// until their tags are invalidated.
    pub fn new(
        repository: Arc<dyn EventRepository>,
        cache: MemoCache,
        revalidate: Option<Duration>,
    ) -> Self {
        let dashboard_events = {
            let repository = Arc::clone(&repository);
            cache.memoize(
                "dashboard_events",
                dashboard_options(DASHBOARD_EVENTS_TAG, revalidate),
                move |user_id: Uuid| {
                    let repository = Arc::clone(&repository);
                    async move { load_dashboard_events(repository.as_ref(), user_id).await }
                },
            )
        };

        let all_events = {
            let repository = Arc::clone(&repository);
            cache.memoize(
                "all_events",
                dashboard_options(EVENTS_TAG, revalidate),
                move |user_id: Uuid| {
                    let repository = Arc::clone(&repository);
                    async move { repository.events_for_user(user_id, None).await }
                },
            )
        };

        let one_event = {
            let repository = Arc::clone(&repository);
            let mut options = MemoOptions::new()
                .with_persist(true)
                .with_revalidate_tags(|(_, event_id): &(Uuid, Uuid)| {
                    vec![EVENT_TAG.to_string(), event_id.to_string()]
                })
                .with_suppress_warnings(true)
                .with_logid(EVENT_TAG);
            options.revalidate = revalidate;
            cache.memoize(
                "one_event",
                options,
                move |(user_id, event_id): (Uuid, Uuid)| {
                    let repository = Arc::clone(&repository);
                    async move { repository.get_event(user_id, event_id).await }
                },
            )
        };

        let dashboard_rsvps = {
            let repository = Arc::clone(&repository);
            cache.memoize(
                "dashboard_rsvps",
                dashboard_options(DASHBOARD_RSVPS_TAG, revalidate),
                move |user_id: Uuid| {
                    let repository = Arc::clone(&repository);
                    async move { repository.rsvps_for_user_events(user_id).await }
                },
            )
        };

        Self {
            repository,
            cache,
            dashboard_events,
            all_events,
            one_event,
            dashboard_rsvps,
        }
    }

    /// The user's first events by start time, with their RSVPs.
    pub async fn dashboard_events(&self, user_id: Uuid) -> QueryResult<Vec<DashboardEvent>> {
        self.dashboard_events.call(user_id).await
    }

    pub async fn all_events(&self, user_id: Uuid) -> QueryResult<Vec<Event>> {
        self.all_events.call(user_id).await
    }

    pub async fn one_event(&self, user_id: Uuid, event_id: Uuid) -> QueryResult<Option<Event>> {
        self.one_event.call((user_id, event_id)).await
    }

    pub async fn dashboard_rsvps(&self, user_id: Uuid) -> QueryResult<Vec<DashboardRsvp>> {
        self.dashboard_rsvps.call(user_id).await
    }

    /// Creates a draft event with a generated name starting now.
    ///
    /// The event is stored before the dashboard and event list tags are
    /// invalidated. A failed invalidation is logged, not returned, since the
    /// write itself succeeded.
    ///
    /// Both steps run on a spawned task, so dropping the returned future
    /// after the write committed still invalidates.
    pub async fn create_new_event(&self, user_id: Uuid) -> Result<Event, RepositoryError> {
        let name = {
            let mut rng = rand::rng();
            event_name(
                rng.random_range(0..ADJECTIVES.len()),
                rng.random_range(0..NOUNS.len()),
            )
        };
        let event = Event::new(user_id, name, Utc::now());

        let repository = Arc::clone(&self.repository);
        let cache = self.cache.clone();
        let task = tokio::spawn(async move {
            repository.create_event(&event).await?;
            tracing::debug!(event_id = %event.id, %user_id, name = %event.name, "Event created");

            if let Err(err) = cache.invalidate(&[DASHBOARD_EVENTS_TAG, EVENTS_TAG]).await {
                tracing::warn!(event_id = %event.id, error = %err, "Failed to invalidate event caches");
            }

            Ok::<_, RepositoryError>(event)
        });

        task.await
            .map_err(|err| RepositoryError::QueryFailed(format!("Event creation task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    use evently_core::events::{Attendee, Rsvp, RsvpStatus};
    use evently_core::storage::Result;

    use crate::cache::MemoryCache;
    use crate::storage::InMemoryRepository;

    const TEST_MAX_ENTRIES: usize = 1000;

    /// Delegates to an in-memory store and counts reads.
    struct CountingRepository {
        inner: InMemoryRepository,
        events_for_user_calls: AtomicUsize,
        get_event_calls: AtomicUsize,
        /// Time `create_event` keeps running after the insert landed.
        create_delay: Option<std::time::Duration>,
    }

    impl CountingRepository {
        fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                events_for_user_calls: AtomicUsize::new(0),
                get_event_calls: AtomicUsize::new(0),
                create_delay: None,
            }
        }
    }

    #[async_trait]
    impl EventRepository for CountingRepository {
        async fn events_for_user(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<Event>> {
            self.events_for_user_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.events_for_user(user_id, limit).await
        }

        async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Event>> {
            self.get_event_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_event(user_id, event_id).await
        }

        async fn create_event(&self, event: &Event) -> Result<()> {
            self.inner.create_event(event).await?;
            if let Some(delay) = self.create_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }

        async fn rsvps_for_event(&self, event_id: Uuid) -> Result<Vec<Rsvp>> {
            self.inner.rsvps_for_event(event_id).await
        }

        async fn rsvps_for_user_events(&self, user_id: Uuid) -> Result<Vec<DashboardRsvp>> {
            self.inner.rsvps_for_user_events(user_id).await
        }

        async fn create_attendee(&self, attendee: &Attendee) -> Result<()> {
            self.inner.create_attendee(attendee).await
        }

        async fn create_rsvp(&self, rsvp: &Rsvp) -> Result<()> {
            self.inner.create_rsvp(rsvp).await
        }
    }

    fn setup() -> (Arc<CountingRepository>, EventQueries) {
        let repository = Arc::new(CountingRepository::new());
        let cache = MemoCache::new(Arc::new(MemoryCache::new(TEST_MAX_ENTRIES)));
        let queries = EventQueries::new(repository.clone(), cache, None);
        (repository, queries)
    }

    fn launch(user_id: Uuid) -> Event {
        let start_on = Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).unwrap();
        Event::new(user_id, "Launch", start_on)
    }

    #[tokio::test]
    async fn test_new_event_shows_up_on_dashboard() {
        let (repository, queries) = setup();
        let user_id = Uuid::new_v4();
        repository.create_event(&launch(user_id)).await.unwrap();

        let before = queries.dashboard_events(user_id).await.unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].event.name, "Launch");

        let cached = queries.dashboard_events(user_id).await.unwrap();
        assert_eq!(cached, before);
        assert_eq!(repository.events_for_user_calls.load(Ordering::SeqCst), 1);

        let created = queries.create_new_event(user_id).await.unwrap();

        let after = queries.dashboard_events(user_id).await.unwrap();
        let names: Vec<&str> = after.iter().map(|e| e.event.name.as_str()).collect();
        assert_eq!(names, vec!["Launch", created.name.as_str()]);
        assert_eq!(repository.events_for_user_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_write_without_invalidation_serves_cached_value() {
        let (repository, queries) = setup();
        let user_id = Uuid::new_v4();
        repository.create_event(&launch(user_id)).await.unwrap();

        assert_eq!(queries.all_events(user_id).await.unwrap().len(), 1);

        repository
            .create_event(&Event::new(user_id, "Afterparty", Utc::now()))
            .await
            .unwrap();

        assert_eq!(queries.all_events(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_new_event_invalidates_event_list() {
        let (_, queries) = setup();
        let user_id = Uuid::new_v4();

        assert!(queries.all_events(user_id).await.unwrap().is_empty());

        let created = queries.create_new_event(user_id).await.unwrap();
        let events = queries.all_events(user_id).await.unwrap();

        assert_eq!(events, vec![created.clone()]);
        assert!(created.name.ends_with(" event"));
        assert_eq!(created.status, evently_core::events::EventStatus::Draft);
    }

    #[tokio::test]
    async fn test_dropped_create_still_invalidates() {
        let repository = Arc::new(CountingRepository {
            create_delay: Some(std::time::Duration::from_millis(50)),
            ..CountingRepository::new()
        });
        let cache = MemoCache::new(Arc::new(MemoryCache::new(TEST_MAX_ENTRIES)));
        let queries = EventQueries::new(repository.clone(), cache, None);
        let user_id = Uuid::new_v4();

        assert!(queries.all_events(user_id).await.unwrap().is_empty());

        // Gives up while the insert has landed but create_event is still running
        let dropped = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            queries.create_new_event(user_id),
        )
        .await;
        assert!(dropped.is_err());
        assert_eq!(repository.inner.events_for_user(user_id, None).await.unwrap().len(), 1);

        let mut events = Vec::new();
        for _ in 0..50 {
            events = queries.all_events(user_id).await.unwrap();
            if !events.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_events_limited_and_ordered() {
        let (repository, queries) = setup();
        let user_id = Uuid::new_v4();
        let first = launch(user_id);
        for day in (1..=7).rev() {
            let start_on = first.start_on + Duration::days(day);
            repository
                .create_event(&Event::new(user_id, format!("Day {day}"), start_on))
                .await
                .unwrap();
        }
        repository.create_event(&first).await.unwrap();

        let dashboard = queries.dashboard_events(user_id).await.unwrap();

        assert_eq!(dashboard.len(), DASHBOARD_EVENTS_LIMIT);
        assert_eq!(dashboard[0].event.name, "Launch");
        assert_eq!(dashboard[1].event.name, "Day 1");
    }

    #[tokio::test]
    async fn test_dashboard_events_include_rsvps() {
        let (repository, queries) = setup();
        let user_id = Uuid::new_v4();
        let event = launch(user_id);
        let attendee = Attendee::new("Ada", "ada@example.com");
        repository.create_event(&event).await.unwrap();
        repository.create_attendee(&attendee).await.unwrap();
        let rsvp = Rsvp::new(event.id, attendee.id, RsvpStatus::Going);
        repository.create_rsvp(&rsvp).await.unwrap();

        let dashboard = queries.dashboard_events(user_id).await.unwrap();
        assert_eq!(dashboard[0].rsvps, vec![rsvp.clone()]);

        let rsvps = queries.dashboard_rsvps(user_id).await.unwrap();
        assert_eq!(rsvps.len(), 1);
        assert_eq!(rsvps[0].attendee.name, "Ada");
    }

    #[tokio::test]
    async fn test_one_event_invalidated_by_its_id() {
        let (repository, queries) = setup();
        let user_id = Uuid::new_v4();
        let event = launch(user_id);
        let other = Event::new(user_id, "Other", Utc::now());
        repository.create_event(&event).await.unwrap();
        repository.create_event(&other).await.unwrap();

        queries.one_event(user_id, event.id).await.unwrap();
        queries.one_event(user_id, other.id).await.unwrap();
        assert_eq!(repository.get_event_calls.load(Ordering::SeqCst), 2);

        queries.cache.invalidate(&[event.id.to_string()]).await.unwrap();

        queries.one_event(user_id, event.id).await.unwrap();
        queries.one_event(user_id, other.id).await.unwrap();
        assert_eq!(repository.get_event_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_one_event_scoped_to_creator() {
        let (repository, queries) = setup();
        let event = launch(Uuid::new_v4());
        repository.create_event(&event).await.unwrap();

        let found = queries.one_event(Uuid::new_v4(), event.id).await.unwrap();
        assert!(found.is_none());
    }
}
