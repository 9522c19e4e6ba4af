//! Core `SoundClassifier` trait, request/response types and the
//! always-failing [`UnavailableClassifier`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ClassifierError
// ---------------------------------------------------------------------------

/// Errors that can occur while classifying an audio window.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// HTTP transport or connection error.
    #[error("classifier request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("classifier request timed out")]
    Timeout,

    /// The response was not a valid `{label, confidence}` record.
    #[error("failed to parse classifier response: {0}")]
    Parse(String),

    /// No classifier backend is configured.
    #[error("no classifier backend is available")]
    Unavailable,
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClassifierError::Timeout
        } else {
            ClassifierError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Mono audio covering one event, sent to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioWindow {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioWindow {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Semantic label for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// SoundClassifier trait
// ---------------------------------------------------------------------------

/// Async black-box classifier.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn SoundClassifier>` between worker tasks.
#[async_trait]
pub trait SoundClassifier: Send + Sync {
    async fn classify(&self, window: &AudioWindow) -> Result<Classification, ClassifierError>;
}

// ---------------------------------------------------------------------------
// UnavailableClassifier
// ---------------------------------------------------------------------------

/// Used when classification is disabled.  Every request fails with
/// [`ClassifierError::Unavailable`], so every alert is labelled `unknown`
/// while still carrying its direction.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableClassifier;

#[async_trait]
impl SoundClassifier for UnavailableClassifier {
    async fn classify(&self, _window: &AudioWindow) -> Result<Classification, ClassifierError> {
        Err(ClassifierError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_always_fails() {
        let window = AudioWindow::new(16_000, vec![0.1; 160]);
        let err = UnavailableClassifier.classify(&window).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable));
    }

    #[test]
    fn window_duration() {
        assert_eq!(AudioWindow::new(16_000, vec![0.0; 8_000]).duration_ms(), 500);
        assert_eq!(AudioWindow::new(0, vec![0.0; 10]).duration_ms(), 0);
    }

    #[test]
    fn classifier_is_object_safe() {
        let c: Box<dyn SoundClassifier> = Box::new(UnavailableClassifier);
        drop(c);
    }
}
