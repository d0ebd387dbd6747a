//! Core library for evently.
//!
//! Pure types and traits shared by the server crate: the memoization cache
//! vocabulary (keys, entries, options, backend traits) and the events domain
//! (events, RSVPs, attendees and the repository trait that stores them).

pub mod cache;
pub mod events;
pub mod storage;
