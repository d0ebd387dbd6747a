//! Generated event names ("brave otter event").
//!
//! The word lists are pure data; callers pick the indices, usually at random.

pub const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "daring", "eager", "fancy", "gentle", "happy", "jolly", "keen",
    "lively", "mellow", "nimble", "proud", "quiet", "rapid", "sunny", "tidy", "vivid", "witty",
];

pub const NOUNS: &[&str] = &[
    "badger", "comet", "dolphin", "falcon", "glacier", "harbor", "island", "jaguar", "lantern",
    "meadow", "nebula", "otter", "pelican", "quartz", "river", "summit", "tiger", "valley",
    "walrus", "zephyr",
];

/// Builds an event name from word-list indices. Indices wrap around.
///
/// # Examples
///
/// ```
/// use evently_core::events::event_name;
///
/// assert_eq!(event_name(1, 11), "brave otter event");
/// ```
pub fn event_name(adjective: usize, noun: usize) -> String {
    format!(
        "{} {} event",
        ADJECTIVES[adjective % ADJECTIVES.len()],
        NOUNS[noun % NOUNS.len()]
    )
}
