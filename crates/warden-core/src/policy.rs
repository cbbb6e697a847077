//! Deterministic content-safety decision engine.
//!
//! Operates on multiple imperfect signals and produces an explainable
//! decision. Prioritizes consistency and false-positive resistance,
//! especially for drawings/cartoons/anime. Identical signals always
//! produce an identical decision.
//!
//! ## Evaluation order
//!
//! 1. Downgrade eligibility is computed (never applied in the child profile)
//! 2. The profile-specific policy produces a raw decision + reason
//! 3. If eligible, severity steps down one level

use serde::{Deserialize, Serialize};

use crate::signals::{AgeProfile, ContentSignals};

/// Final verdict for a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Content is safe to display.
    Allow,
    /// Content may be risky; show a warning but allow.
    Warn,
    /// Content must be blocked.
    Block,
    /// No confident decision; apply safe defaults (blur, hide preview).
    #[default]
    Uncertain,
}

impl Decision {
    /// Returns a human-readable name for this decision.
    pub fn name(&self) -> &'static str {
        match self {
            Decision::Allow => "Allow",
            Decision::Warn => "Warn",
            Decision::Block => "Block",
            Decision::Uncertain => "Uncertain",
        }
    }

    /// Steps severity down one level for false-positive compensation.
    pub fn downgraded(self) -> Self {
        match self {
            Decision::Block => Decision::Uncertain,
            Decision::Uncertain => Decision::Warn,
            Decision::Warn => Decision::Allow,
            Decision::Allow => Decision::Allow,
        }
    }

    /// True if the consuming surface should withhold the content.
    pub fn should_block(&self) -> bool {
        matches!(self, Decision::Block)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of the decision engine. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    /// Final decision after any downgrade.
    pub decision: Decision,
    /// Profile active when the decision was made.
    pub profile: AgeProfile,
    /// Primary reason for the decision, in plain language.
    pub dominant_reason: String,
    /// Reason severity was reduced, if a downgrade applied.
    pub downgrade_reason: Option<String>,
    /// The signals that produced this decision.
    pub signals: ContentSignals,
}

impl DecisionResult {
    /// True for decisions that must reach the event sink.
    ///
    /// Allow/Warn are not logged by default to keep event volume down.
    pub fn requires_logging(&self) -> bool {
        matches!(self.decision, Decision::Block | Decision::Uncertain)
    }

    /// Log-friendly summary with the full signal snapshot.
    pub fn to_log_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("decision={} profile={}", self.decision, self.profile));
        out.push_str(&format!(" reason=\"{}\"", self.dominant_reason));
        if let Some(reason) = &self.downgrade_reason {
            out.push_str(&format!(" downgrade=\"{}\"", reason));
        }
        out.push_str(&format!(
            " porn={:.3} hentai={:.3} suggestive={:.3} drawing={:.3} neutral={:.3}",
            self.signals.porn,
            self.signals.hentai,
            self.signals.suggestive,
            self.signals.drawing,
            self.signals.neutral
        ));
        out.push_str(&format!(
            " skin={:.3} edge={:.3} frames={} text_core={:.3} image_core={:.3} safe_ctx={}",
            self.signals.skin_ratio,
            self.signals.edge_density,
            self.signals.video_consistency,
            self.signals.text_core(),
            self.signals.image_core(),
            self.signals.has_safe_context
        ));
        out
    }
}

/// Produces a decision from the signal bundle. Pure function: identical
/// inputs always yield an identical result.
pub fn decide(signals: &ContentSignals) -> DecisionResult {
    // Downgrade compensation never applies in the child profile.
    let eligible = signals.profile != AgeProfile::Child && signals.should_downgrade();
    let downgrade_reason = if eligible { signals.downgrade_reason() } else { None };

    let (raw, reason) = match signals.profile {
        AgeProfile::Child => child_policy(signals),
        AgeProfile::Teen => teen_policy(signals),
        AgeProfile::Adult => adult_policy(signals),
    };

    let decision = if eligible { raw.downgraded() } else { raw };

    let result = DecisionResult {
        decision,
        profile: signals.profile,
        dominant_reason: reason,
        downgrade_reason,
        signals: signals.clone(),
    };

    if result.requires_logging() {
        tracing::warn!("{}", result.to_log_string());
    }

    result
}

/// Hard block produced by a non-overridable explicit text match.
///
/// Bypasses the profile policies and the downgrade path entirely; nothing
/// downstream may weaken it.
pub fn explicit_block(signals: ContentSignals, label: &str) -> DecisionResult {
    let result = DecisionResult {
        decision: Decision::Block,
        profile: signals.profile,
        dominant_reason: format!("Explicitly harmful content: {}", label),
        downgrade_reason: None,
        signals,
    };
    tracing::warn!("{}", result.to_log_string());
    result
}

/// Child policy: block if any significant risk is detected, allow only
/// content that is clearly safe, default to uncertain.
fn child_policy(s: &ContentSignals) -> (Decision, String) {
    if s.porn >= 0.15 {
        return (
            Decision::Block,
            format!("Pornographic content detected ({:.0}% confidence)", s.porn * 100.0),
        );
    }

    // Explicit animated content, unless it is clearly a harmless drawing.
    if s.hentai >= 0.15 && s.drawing < 0.70 {
        return (
            Decision::Block,
            format!("Adult animated content detected ({:.0}% confidence)", s.hentai * 100.0),
        );
    }

    if s.suggestive >= 0.25 {
        return (
            Decision::Block,
            format!("Suggestive content detected ({:.0}% confidence)", s.suggestive * 100.0),
        );
    }

    if s.image_core() >= 0.30 {
        return (
            Decision::Block,
            format!("Combined risk score too high ({:.0}%)", s.image_core() * 100.0),
        );
    }

    if s.porn >= 0.08 || s.hentai >= 0.08 || s.suggestive >= 0.15 {
        return (
            Decision::Uncertain,
            "Low-level risk detected - applying blur for safety".to_string(),
        );
    }

    if s.drawing >= 0.60 && s.porn < 0.05 && s.hentai < 0.05 && s.suggestive < 0.10 {
        return (Decision::Allow, "Safe drawing/cartoon content".to_string());
    }

    if s.neutral >= 0.70 {
        return (Decision::Allow, "Neutral content detected".to_string());
    }

    if s.image_core() < 0.10 && s.suggestive < 0.10 {
        return (Decision::Allow, "All scores in safe zone".to_string());
    }

    (
        Decision::Uncertain,
        "Cannot confirm safety - applying protective blur".to_string(),
    )
}

/// Teen policy: blocks need corroboration (video consistency or text risk).
fn teen_policy(s: &ContentSignals) -> (Decision, String) {
    if s.drawing >= 0.50 && s.porn < 0.25 {
        return (Decision::Allow, "Drawing/cartoon content".to_string());
    }

    if s.image_core() >= 0.75 && (s.video_consistency >= 2 || s.text_core() >= 0.40) {
        return (
            Decision::Block,
            format!("Explicit content confirmed ({:.0}% confidence)", s.image_core() * 100.0),
        );
    }

    if s.suggestive >= 0.60 && s.porn < 0.40 {
        return (Decision::Warn, "Suggestive content detected".to_string());
    }

    if s.image_core() >= 0.50 {
        return (
            Decision::Uncertain,
            "Moderate risk - review recommended".to_string(),
        );
    }

    (Decision::Allow, "Content within acceptable range".to_string())
}

/// Adult policy: autonomy first; blocks only confirmed explicit material.
fn adult_policy(s: &ContentSignals) -> (Decision, String) {
    if s.drawing >= 0.50 {
        return (Decision::Allow, "Drawing/animated content".to_string());
    }

    if s.hentai >= 0.50 && s.porn < 0.50 {
        return (
            Decision::Allow,
            "Animated content without explicit real material".to_string(),
        );
    }

    if s.suggestive >= 0.50 && s.porn < 0.60 {
        return (Decision::Allow, "Suggestive content within adult range".to_string());
    }

    // Confirmed across frames, not a single-frame spike.
    if s.porn >= 0.85 && s.video_consistency >= 2 {
        return (
            Decision::Block,
            format!("Explicit content confirmed ({:.0}% confidence)", s.porn * 100.0),
        );
    }

    if s.porn >= 0.70 {
        return (Decision::Warn, "Potentially explicit content".to_string());
    }

    (Decision::Allow, "Content acceptable for adult profile".to_string())
}
