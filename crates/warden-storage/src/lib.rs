//! Warden Storage - SQLite persistence layer.
//!
//! Two tables back the enforcement core: `decision_cache` holds the
//! persisted copy of the perceptual fingerprint cache (warm start), and
//! `events` is the append-only sink for block/uncertain decisions and
//! infrastructure failures.
//!
//! Every caller treats this layer as optional: a read/write failure
//! degrades the pipeline to memory-only operation and is never surfaced
//! to the decision path.

mod database;
mod error;
mod models;
mod pool;
mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{CachedDecision, NewSafetyEvent, SafetyEvent};
pub use pool::{ConnectionPool, PooledConnection};
pub use repository::{hash_request_id, CacheRepo, EventsRepo};
pub use schema::run_migrations;
