pub mod cache;
pub mod dashboard;
pub mod events;
pub mod health;
