//! Repository structs for each table.

mod cache;
mod events;

pub use cache::CacheRepo;
pub use events::{hash_request_id, EventsRepo};
