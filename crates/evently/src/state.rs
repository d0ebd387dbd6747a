//! Shared application state.

use crate::{cache::MemoCache, queries::EventQueries};

/// Shared application state.
///
/// Cloned for each request handler. Both fields are cheap handles over
/// shared backends.
#[derive(Clone)]
pub struct AppState {
    pub queries: EventQueries,
    pub cache: MemoCache,
}

impl AppState {
    pub fn new(queries: EventQueries, cache: MemoCache) -> Self {
        Self { queries, cache }
    }
}
