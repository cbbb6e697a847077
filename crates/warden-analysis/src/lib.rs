//! Warden Analysis - the asynchronous traffic-to-decision orchestrator.
//!
//! Sits between the tunnel layer (which surfaces candidate resources) and
//! the consuming surface (which blurs, blocks, or releases content):
//!
//! - [`AnalysisQueue`] deduplicates concurrent requests, short-circuits
//!   trusted sources, and runs the fetch/decode/classify/fuse/decide
//!   pipeline on worker tasks with guaranteed pending-set cleanup.
//! - [`PerceptualCache`] maps image fingerprints to past decisions, with
//!   an optional SQLite-persisted copy for warm starts.
//! - [`SessionRegistry`] keys fusion smoothing state per browsing
//!   session so unrelated content never shares risk history.
//!
//! The whole crate fails open: classifier, fetch, and persistence errors
//! degrade gracefully and never block traffic or hang the pipeline.

mod error;
mod fetch;
mod perceptual;
mod queue;
mod sessions;
mod sink;

pub use error::{AnalysisError, Result};
pub use fetch::{
    HttpResourceFetcher, ResourceFetcher, DEFAULT_FETCH_TIMEOUT, MAX_RESOURCE_BYTES,
};
pub use perceptual::{CacheEntry, DecisionStore, PerceptualCache, DEFAULT_CACHE_CAPACITY};
pub use queue::{
    AnalysisQueue, AnalysisQueueBuilder, AnalysisRequest, EnqueueOutcome, QueueConfig,
};
pub use sessions::SessionRegistry;
pub use sink::{DecisionPublisher, EventSink};
