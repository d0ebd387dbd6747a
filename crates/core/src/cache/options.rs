//! Per-producer memoization options.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Diagnostic logging toggles for a memoized producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLabel {
    /// Log cache hits and misses.
    Datacache,
    /// Include keys, tags and fill timings.
    Verbose,
    /// Log callers joining an in-flight fill.
    Dedupe,
}

impl LogLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLabel::Datacache => "datacache",
            LogLabel::Verbose => "verbose",
            LogLabel::Dedupe => "dedupe",
        }
    }
}

impl fmt::Display for LogLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type TagsFn<A> = Arc<dyn Fn(&A) -> Vec<String> + Send + Sync>;

/// Options controlling how a producer is memoized.
///
/// # Example
///
/// ```
/// use evently_core::cache::{LogLabel, MemoOptions};
///
/// let options = MemoOptions::<(String, String)>::new()
///     .with_persist(true)
///     .with_revalidate_tags(|(_, event_id)| vec!["event".to_string(), event_id.clone()])
///     .with_suppress_warnings(true)
///     .with_log([LogLabel::Datacache])
///     .with_logid("event");
///
/// let tags = options.tags_for(&("u1".to_string(), "e1".to_string()));
/// assert!(tags.contains("event") && tags.contains("e1"));
/// ```
pub struct MemoOptions<A> {
    /// Store entries in the durable backend.
    pub persist: bool,
    /// Silence non-fatal warnings and bypass the cache when a key cannot be derived.
    pub suppress_warnings: bool,
    pub log: Vec<LogLabel>,
    pub logid: Option<String>,
    /// Time after which an entry is considered stale.
    pub revalidate: Option<Duration>,
    revalidate_tags: TagsFn<A>,
}

impl<A> MemoOptions<A> {
    /// Creates options with no tags, no persistence and no logging.
    pub fn new() -> Self {
        Self {
            persist: false,
            suppress_warnings: false,
            log: Vec::new(),
            logid: None,
            revalidate: None,
            revalidate_tags: Arc::new(|_| Vec::new()),
        }
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Sets the function computing the tags of a call from its arguments.
    pub fn with_revalidate_tags<F>(mut self, tags: F) -> Self
    where
        F: Fn(&A) -> Vec<String> + Send + Sync + 'static,
    {
        self.revalidate_tags = Arc::new(tags);
        self
    }

    pub fn with_suppress_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    pub fn with_log(mut self, labels: impl IntoIterator<Item = LogLabel>) -> Self {
        self.log = labels.into_iter().collect();
        self
    }

    pub fn with_logid(mut self, logid: impl Into<String>) -> Self {
        self.logid = Some(logid.into());
        self
    }

    pub fn with_revalidate(mut self, ttl: Duration) -> Self {
        self.revalidate = Some(ttl);
        self
    }

    /// Computes the tag set for a call's arguments.
    pub fn tags_for(&self, args: &A) -> BTreeSet<String> {
        (self.revalidate_tags)(args).into_iter().collect()
    }

    /// Returns true if `label` is enabled.
    pub fn logs(&self, label: LogLabel) -> bool {
        self.log.contains(&label)
    }

    /// Labels stored on entries: the log labels followed by `logid:<id>`.
    pub fn entry_labels(&self) -> Vec<String> {
        self.log
            .iter()
            .map(|label| label.as_str().to_string())
            .chain(self.logid.iter().map(|id| format!("logid:{id}")))
            .collect()
    }
}

impl<A> Default for MemoOptions<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for MemoOptions<A> {
    fn clone(&self) -> Self {
        Self {
            persist: self.persist,
            suppress_warnings: self.suppress_warnings,
            log: self.log.clone(),
            logid: self.logid.clone(),
            revalidate: self.revalidate,
            revalidate_tags: Arc::clone(&self.revalidate_tags),
        }
    }
}

impl<A> fmt::Debug for MemoOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoOptions")
            .field("persist", &self.persist)
            .field("suppress_warnings", &self.suppress_warnings)
            .field("log", &self.log)
            .field("logid", &self.logid)
            .field("revalidate", &self.revalidate)
            .finish_non_exhaustive()
    }
}
