//! Contract for the external visual/text classifier.
//!
//! The classifier is an opaque service: images go in as decoded pixels,
//! text goes in as a fixed-length numeric vector, and named category
//! scores in [0, 1] come back. Every failure path here fails open: a
//! classifier that cannot answer is treated as a zero score, never as a
//! block and never as a hang.

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::keywords;

/// Length of the numeric text vector fed to the classifier.
pub const TEXT_VECTOR_LEN: usize = 3;

/// Fixed-length numeric text input for the classifier.
pub type TextVector = [f32; TEXT_VECTOR_LEN];

/// Default timeout for a single classifier invocation.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(3);

/// Named category scores returned by the visual classifier, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageCategoryScores {
    /// Pornographic content.
    pub porn: f32,
    /// Explicit animated content.
    pub hentai: f32,
    /// Suggestive content.
    pub suggestive: f32,
    /// Drawing/cartoon style.
    pub drawing: f32,
    /// Neutral content.
    pub neutral: f32,
}

impl ImageCategoryScores {
    /// Maximum of the explicit-leaning categories, the raw AI risk signal.
    pub fn max_explicit(&self) -> f32 {
        self.porn.max(self.hentai).max(self.suggestive)
    }
}

/// The external classifier interface.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    /// Scores a decoded image across the five content categories.
    async fn classify_image(&self, image: &DynamicImage) -> Result<ImageCategoryScores>;

    /// Scores a vectorized text sample; returns a single risk score in [0, 1].
    async fn classify_text(&self, vector: &TextVector) -> Result<f32>;
}

/// Invokes the image classifier with a timeout, failing open to zero scores.
///
/// Timeouts, transport errors, and malformed outputs all degrade to an
/// all-zero score bundle with a warning log; the pipeline continues.
pub async fn classify_image_fail_open(
    classifier: &dyn ContentClassifier,
    image: &DynamicImage,
    timeout: Duration,
) -> ImageCategoryScores {
    match tokio::time::timeout(timeout, classifier.classify_image(image)).await {
        Ok(Ok(scores)) => scores,
        Ok(Err(e)) => {
            tracing::warn!("Image classifier failed, failing open: {}", e);
            ImageCategoryScores::default()
        }
        Err(_) => {
            tracing::warn!("Image classifier timed out after {:?}, failing open", timeout);
            ImageCategoryScores::default()
        }
    }
}

/// Invokes the text classifier with a timeout; on failure falls back to the
/// local rule-based keyword score.
pub async fn classify_text_fail_open(
    classifier: &dyn ContentClassifier,
    text: &str,
    timeout: Duration,
) -> f32 {
    let vector = keywords::vectorize(text);
    match tokio::time::timeout(timeout, classifier.classify_text(&vector)).await {
        Ok(Ok(score)) => score.clamp(0.0, 1.0),
        Ok(Err(e)) => {
            tracing::warn!("Text classifier failed, using keyword fallback: {}", e);
            keywords::risk_score(text)
        }
        Err(_) => {
            tracing::warn!("Text classifier timed out after {:?}, using keyword fallback", timeout);
            keywords::risk_score(text)
        }
    }
}

/// A classifier that always errors. Stands in where no model is deployed;
/// everything downstream of it fails open.
#[derive(Debug, Default)]
pub struct UnavailableClassifier;

#[async_trait]
impl ContentClassifier for UnavailableClassifier {
    async fn classify_image(&self, _image: &DynamicImage) -> Result<ImageCategoryScores> {
        Err(CoreError::Classifier("no classifier deployed".to_string()))
    }

    async fn classify_text(&self, _vector: &TextVector) -> Result<f32> {
        Err(CoreError::Classifier("no classifier deployed".to_string()))
    }
}
