//! Unified signal bundle consumed by the decision engine.
//!
//! No single signal may block content alone: visual category scores,
//! pixel-level auxiliaries, and text signals are combined here and judged
//! together by the policy engine.

use serde::{Deserialize, Serialize};

/// Active protection tier selecting thresholds and fusion weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeProfile {
    /// Strictest tier. Downgrade compensation never applies here.
    #[default]
    Child,
    /// Balanced tier for teenagers.
    Teen,
    /// Permissive tier that still blocks confirmed explicit material.
    Adult,
}

impl AgeProfile {
    /// Returns the profile as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeProfile::Child => "child",
            AgeProfile::Teen => "teen",
            AgeProfile::Adult => "adult",
        }
    }

    /// Parses a profile string. Unknown values fall back to the strictest
    /// profile rather than failing the request.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "child" => AgeProfile::Child,
            "teen" => AgeProfile::Teen,
            "adult" => AgeProfile::Adult,
            other => {
                tracing::warn!("Unknown age profile '{}', falling back to child", other);
                AgeProfile::Child
            }
        }
    }
}

impl std::fmt::Display for AgeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source type for content being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    /// A single still image.
    #[default]
    Image,
    /// A frame sequence; enables the video-consistency compensation rule.
    Video,
}

/// Per-request bundle of every signal the decision engine sees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSignals {
    /// Pornographic content score (0.0 - 1.0).
    pub porn: f32,
    /// Explicit animated content score (0.0 - 1.0).
    pub hentai: f32,
    /// Suggestive content score (0.0 - 1.0).
    pub suggestive: f32,
    /// Drawing/cartoon detection score (0.0 - 1.0).
    pub drawing: f32,
    /// Neutral/safe content score (0.0 - 1.0).
    pub neutral: f32,

    /// Ratio of skin-colored pixels (0.0 - 1.0).
    pub skin_ratio: f32,
    /// Edge density; high values indicate cartoon or drawing style (0.0 - 1.0).
    pub edge_density: f32,
    /// Consecutive frames flagged positive (video only).
    pub video_consistency: u32,

    /// Text risk score from the classifier (0.0 - 1.0).
    pub text_risk: f32,
    /// Emoji-based risk score (0.0 - 1.0).
    pub emoji_risk: f32,
    /// Keyword-based risk score (0.0 - 1.0).
    pub keyword_risk: f32,
    /// Whether a safe context (gaming, cooking, ...) was detected.
    pub has_safe_context: bool,
    /// Detected safe-context label, if any.
    pub safe_context_label: Option<String>,

    /// Active protection tier.
    pub profile: AgeProfile,
    /// Content source kind.
    pub source: ContentSource,
}

impl ContentSignals {
    /// Combined image risk: porn + hentai, clamped to [0, 1].
    pub fn image_core(&self) -> f32 {
        (self.porn + self.hentai).clamp(0.0, 1.0)
    }

    /// Maximum text-based risk across text, emoji, and keyword signals.
    pub fn text_core(&self) -> f32 {
        self.text_risk.max(self.emoji_risk).max(self.keyword_risk)
    }

    /// Drawing dominates the explicit signal: likely cartoon, not real NSFW.
    pub fn drawing_dominates(&self) -> bool {
        self.drawing >= 0.60 && self.porn < 0.25
    }

    /// Low skin ratio: unlikely to be nude content.
    pub fn low_skin_ratio(&self) -> bool {
        self.skin_ratio < 0.15
    }

    /// High edge density: indicates cartoon/drawing style.
    pub fn high_edge_density(&self) -> bool {
        self.edge_density > 0.60
    }

    /// Unstable video detection: fewer than 2 consecutive positive frames.
    pub fn unstable_detection(&self) -> bool {
        self.source == ContentSource::Video && self.video_consistency < 2
    }

    /// Safe text context: low text risk or an explicit safe-context flag.
    pub fn safe_text_context(&self) -> bool {
        self.text_core() < 0.20 || self.has_safe_context
    }

    /// True if any false-positive compensation condition is met.
    pub fn should_downgrade(&self) -> bool {
        self.drawing_dominates()
            || self.low_skin_ratio()
            || self.high_edge_density()
            || self.unstable_detection()
            || self.safe_text_context()
    }

    /// Human-readable reason for the downgrade, if any condition holds.
    pub fn downgrade_reason(&self) -> Option<String> {
        if self.drawing_dominates() {
            Some(format!(
                "Drawing score ({:.2}) dominates porn score ({:.2})",
                self.drawing, self.porn
            ))
        } else if self.low_skin_ratio() {
            Some(format!("Low skin ratio ({:.2})", self.skin_ratio))
        } else if self.high_edge_density() {
            Some(format!(
                "High edge density ({:.2}) indicates cartoon/drawing",
                self.edge_density
            ))
        } else if self.unstable_detection() {
            Some(format!(
                "Unstable detection (only {} consecutive frames)",
                self.video_consistency
            ))
        } else if self.safe_text_context() {
            Some(match &self.safe_context_label {
                Some(label) => format!("Safe context detected: {}", label),
                None => format!("Low text risk ({:.2})", self.text_core()),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_profile_falls_back_to_child() {
        assert_eq!(AgeProfile::parse("child"), AgeProfile::Child);
        assert_eq!(AgeProfile::parse("TEEN"), AgeProfile::Teen);
        assert_eq!(AgeProfile::parse("adult"), AgeProfile::Adult);
        assert_eq!(AgeProfile::parse("grandparent"), AgeProfile::Child);
        assert_eq!(AgeProfile::parse(""), AgeProfile::Child);
    }

    #[test]
    fn image_core_is_clamped() {
        let signals = ContentSignals {
            porn: 0.8,
            hentai: 0.7,
            ..Default::default()
        };
        assert_eq!(signals.image_core(), 1.0);

        let signals = ContentSignals {
            porn: 0.1,
            hentai: 0.15,
            ..Default::default()
        };
        assert!((signals.image_core() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn text_core_takes_maximum() {
        let signals = ContentSignals {
            text_risk: 0.2,
            emoji_risk: 0.6,
            keyword_risk: 0.4,
            ..Default::default()
        };
        assert!((signals.text_core() - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn drawing_dominates_requires_low_porn() {
        let signals = ContentSignals {
            drawing: 0.65,
            porn: 0.1,
            ..Default::default()
        };
        assert!(signals.drawing_dominates());

        let signals = ContentSignals {
            drawing: 0.65,
            porn: 0.3,
            ..Default::default()
        };
        assert!(!signals.drawing_dominates());
    }

    #[test]
    fn unstable_detection_only_applies_to_video() {
        let image = ContentSignals {
            source: ContentSource::Image,
            video_consistency: 0,
            ..Default::default()
        };
        assert!(!image.unstable_detection());

        let video = ContentSignals {
            source: ContentSource::Video,
            video_consistency: 1,
            ..Default::default()
        };
        assert!(video.unstable_detection());

        let stable = ContentSignals {
            source: ContentSource::Video,
            video_consistency: 3,
            ..Default::default()
        };
        assert!(!stable.unstable_detection());
    }

    #[test]
    fn downgrade_reason_names_the_condition() {
        let signals = ContentSignals {
            drawing: 0.7,
            porn: 0.1,
            skin_ratio: 0.5,
            text_risk: 0.9,
            ..Default::default()
        };
        let reason = signals.downgrade_reason().unwrap();
        assert!(reason.contains("Drawing score"));
    }
}
