//! Warden Core - Signal fusion, context analysis, and policy decisions.
//!
//! This crate holds everything between "we have an image and some page
//! text" and "allow, warn, block, or uncertain": the signal bundle, the
//! context-aware text analyzer, the multi-signal risk-fusion engine, the
//! deterministic policy engine, and the shared cache/fingerprint/trust
//! building blocks.
//!
//! ## Pipeline
//!
//! ```text
//! image bytes ──> fingerprint ──> RiskFusionEngine ──┐
//! page text  ──> ContextTextAnalyzer ──> signals ────┼──> policy::decide
//! host       ──> DomainReputation / UrlRisk ─────────┘         │
//!                                                        DecisionResult
//! ```
//!
//! Decisions are pure functions of their inputs; every cache and the
//! per-session smoothing state live in explicit service objects owned by
//! their construction site, never in process-wide singletons.

pub mod cache;
pub mod classifier;
pub mod context;
pub mod emoji;
pub mod error;
pub mod fingerprint;
pub mod fusion;
pub mod keywords;
pub mod pixels;
pub mod policy;
pub mod signals;
pub mod trust;
pub mod url_risk;

pub use cache::BoundedCache;
pub use classifier::{
    classify_image_fail_open, classify_text_fail_open, ContentClassifier, ImageCategoryScores,
    TextVector, UnavailableClassifier, DEFAULT_CLASSIFIER_TIMEOUT,
};
pub use context::{ContextResult, ContextTextAnalyzer, SafeContext};
pub use error::{CoreError, Result};
pub use fingerprint::{fingerprint, fingerprint_key, parse_fingerprint_key};
pub use fusion::{
    EmbeddedTextScan, NoEmbeddedTextScan, RiskFusionEngine, RiskSignals, UrlSignalRouting,
};
pub use policy::{decide, explicit_block, Decision, DecisionResult};
pub use signals::{AgeProfile, ContentSignals, ContentSource};
pub use trust::{host_of, DomainReputation, StaticReputation, TrustLevel, TrustedSources};
pub use url_risk::{UrlRiskCategory, UrlRiskResult};
