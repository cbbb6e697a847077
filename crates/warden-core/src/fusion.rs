//! Multi-signal risk fusion.
//!
//! Fuses the visual classifier score, network reputation, and page-context
//! risk into one 0-100 value: trust-dependent weighting, a synergy boost
//! when two independent signal families agree, and exponential temporal
//! smoothing across frames.
//!
//! One engine per browsing session. The smoothing state must never be
//! shared across unrelated content; construct an engine per session/tab
//! and call [`RiskFusionEngine::reset`] on navigation.

use std::time::Duration;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::cache::BoundedCache;
use crate::classifier::{classify_image_fail_open, ContentClassifier, DEFAULT_CLASSIFIER_TIMEOUT};
use crate::fingerprint::fingerprint;
use crate::signals::AgeProfile;
use crate::trust::TrustLevel;

/// Capacity of the in-process raw-AI score cache.
const RISK_CACHE_CAPACITY: usize = 100;

/// EMA coefficient for video frames (slow-moving, noise-averaging).
const ALPHA_VIDEO: f32 = 0.1;
/// EMA coefficient for single images.
const ALPHA_IMAGE: f32 = 0.3;

/// Where URL-pattern risk merges before weighting.
///
/// The reference behavior folds it into the context term; the routing is
/// kept adjustable because the original weighting intent is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlSignalRouting {
    /// URL-pattern risk joins the page-context term.
    #[default]
    Context,
    /// URL-pattern risk joins the network-reputation term.
    Network,
}

/// Network and context inputs to fusion, both on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Network/domain reputation risk (0-100).
    pub network_score: f32,
    /// Page-context risk: text, emoji, URL patterns (0-100).
    pub context_score: f32,
    /// Domain trust level driving the weight selection.
    pub trust: TrustLevel,
}

impl RiskSignals {
    /// Builds signals from a trust level with its baseline network score
    /// and no context risk yet.
    pub fn from_trust(trust: TrustLevel) -> Self {
        Self {
            network_score: trust.baseline_network_score(),
            context_score: 0.0,
            trust,
        }
    }

    /// Merges a URL-pattern risk score (0-100) into the configured term.
    pub fn merge_url_signal(&mut self, url_score: f32, routing: UrlSignalRouting) {
        match routing {
            UrlSignalRouting::Context => {
                self.context_score = self.context_score.max(url_score);
            }
            UrlSignalRouting::Network => {
                self.network_score = self.network_score.max(url_score);
            }
        }
    }
}

/// Cheap pre-filter run before the classifier ("kill switch").
///
/// A positive hit (e.g. explicit embedded text found by OCR) forces the
/// maximum score and skips the classifier entirely.
pub trait EmbeddedTextScan: Send + Sync {
    /// Returns true if the image carries explicit embedded text.
    fn contains_explicit_text(&self, image: &DynamicImage) -> bool;
}

/// Pre-filter that never triggers; used when no OCR engine is deployed.
#[derive(Debug, Default)]
pub struct NoEmbeddedTextScan;

impl EmbeddedTextScan for NoEmbeddedTextScan {
    fn contains_explicit_text(&self, _image: &DynamicImage) -> bool {
        false
    }
}

/// Per-session risk fusion engine.
pub struct RiskFusionEngine {
    /// Fingerprint -> raw AI score (0-100). Distinct from the boolean
    /// decision cache; this keeps raw scores so fusion can re-run when
    /// the surrounding signals change.
    risk_cache: BoundedCache<u64, f32>,
    /// EMA state. `None` until the first sample of the session.
    previous: Option<f32>,
    prefilter: Box<dyn EmbeddedTextScan>,
    classifier_timeout: Duration,
}

impl std::fmt::Debug for RiskFusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskFusionEngine")
            .field("cached_scores", &self.risk_cache.len())
            .field("previous", &self.previous)
            .finish()
    }
}

impl RiskFusionEngine {
    /// Creates an engine with no embedded-text pre-filter.
    pub fn new() -> Self {
        Self::with_prefilter(Box::new(NoEmbeddedTextScan))
    }

    /// Creates an engine with an embedded-text pre-filter.
    pub fn with_prefilter(prefilter: Box<dyn EmbeddedTextScan>) -> Self {
        Self {
            risk_cache: BoundedCache::new(RISK_CACHE_CAPACITY),
            previous: None,
            prefilter,
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }

    /// Main pipeline: fingerprint cache, kill switch, classifier, dynamic
    /// weighting, synergy boost, temporal smoothing. Returns 0-100.
    pub async fn compute_risk(
        &mut self,
        image: Option<&DynamicImage>,
        signals: &RiskSignals,
        is_video: bool,
        profile: AgeProfile,
        classifier: &dyn ContentClassifier,
    ) -> f32 {
        // No image payload: fuse the remaining signals only.
        let Some(image) = image else {
            let fused = self.fuse(0.0, signals, profile);
            return self.smooth(fused, is_video);
        };

        // Fingerprint cache: reuse the raw AI score but re-fuse, since the
        // surrounding signals may have changed.
        let fp = fingerprint(image);
        if let Some(cached) = self.cached_ai_score(fp) {
            let fused = self.fuse(cached, signals, profile);
            return self.smooth(fused, is_video);
        }

        // Kill switch: explicit embedded text ends the debate.
        if self.prefilter.contains_explicit_text(image) {
            tracing::warn!("Embedded-text kill switch triggered");
            self.store_ai_score(fp, 100.0);
            return self.smooth(100.0, is_video);
        }

        let scores = classify_image_fail_open(classifier, image, self.classifier_timeout).await;
        let ai_raw = scores.max_explicit() * 100.0;
        self.store_ai_score(fp, ai_raw);

        let fused = self.fuse(ai_raw, signals, profile);
        self.smooth(fused, is_video)
    }

    /// Returns the cached raw AI score for a fingerprint, if any.
    pub fn cached_ai_score(&self, fp: u64) -> Option<f32> {
        self.risk_cache.get(&fp).copied()
    }

    /// Caches a raw AI score (0-100) under a fingerprint so later frames
    /// of the same content skip the classifier.
    pub fn store_ai_score(&mut self, fp: u64, score: f32) {
        self.risk_cache.insert(fp, score);
    }

    /// Dynamic weighting plus synergy boost. Pure; returns 0-100.
    pub fn fuse(&self, ai_score: f32, signals: &RiskSignals, profile: AgeProfile) -> f32 {
        // The child profile trusts the domain less for visual content, so
        // the AI weight stays high regardless of reputation.
        let (w_ai, w_net, w_ctx) = if profile == AgeProfile::Child {
            (0.65, 0.20, 0.15)
        } else {
            match signals.trust {
                // A very confident classifier outranks domain meta-trust.
                TrustLevel::High if ai_score >= 85.0 => (0.50, 0.30, 0.20),
                TrustLevel::High => (0.30, 0.40, 0.30),
                TrustLevel::Neutral => (0.60, 0.25, 0.15),
                TrustLevel::Suspicious => (0.80, 0.10, 0.10),
            }
        };

        let mut risk = ai_score * w_ai
            + signals.network_score * w_net
            + signals.context_score * w_ctx;

        // Two independent signal families agreeing reinforce each other.
        if ai_score > 40.0 && signals.context_score > 40.0 {
            risk *= 1.25;
        }

        risk.clamp(0.0, 100.0)
    }

    /// Exponential temporal smoothing. The first sample of a session is
    /// returned unsmoothed and seeds the state.
    pub fn smooth(&mut self, current: f32, is_video: bool) -> f32 {
        let alpha = if is_video { ALPHA_VIDEO } else { ALPHA_IMAGE };

        match self.previous {
            None => {
                self.previous = Some(current);
                current
            }
            Some(prev) => {
                let smoothed = alpha * current + (1.0 - alpha) * prev;
                self.previous = Some(smoothed);
                smoothed
            }
        }
    }

    /// Clears the smoothing state. Must be called on page/session
    /// navigation so risk does not bleed across unrelated content.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Number of raw scores currently cached.
    pub fn cached_scores(&self) -> usize {
        self.risk_cache.len()
    }
}

impl Default for RiskFusionEngine {
    fn default() -> Self {
        Self::new()
    }
}
