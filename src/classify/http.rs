//! `HttpClassifier`: forwards event audio to an external classification
//! service.
//!
//! Wire format:
//!
//! ```text
//! POST {base_url}/classify
//! { "sample_rate": 16000, "samples": [0.01, -0.02, ...] }
//!
//! 200 OK
//! { "label": "Doorbell", "confidence": 0.87 }
//! ```

use std::time::Duration;

use async_trait::async_trait;

use super::classifier::{AudioWindow, Classification, ClassifierError, SoundClassifier};
use crate::config::ClassifierConfig;

pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_ms`; a default client is used if the builder fails.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: classify_url(&config.base_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn classify_url(base_url: &str) -> String {
    format!("{}/classify", base_url.trim_end_matches('/'))
}

/// Parse and validate a `{label, confidence}` response body.
pub fn parse_response(body: &serde_json::Value) -> Result<Classification, ClassifierError> {
    let label = body["label"]
        .as_str()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ClassifierError::Parse("missing `label`".into()))?;

    let confidence = body["confidence"]
        .as_f64()
        .ok_or_else(|| ClassifierError::Parse("missing `confidence`".into()))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ClassifierError::Parse(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }

    Ok(Classification::new(label, confidence as f32))
}

#[async_trait]
impl SoundClassifier for HttpClassifier {
    async fn classify(&self, window: &AudioWindow) -> Result<Classification, ClassifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(window)
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_joins_without_double_slash() {
        let config = ClassifierConfig {
            base_url: "http://localhost:5000/".into(),
            ..ClassifierConfig::default()
        };
        assert_eq!(HttpClassifier::from_config(&config).url(), "http://localhost:5000/classify");
        assert_eq!(classify_url("http://h"), "http://h/classify");
    }

    #[test]
    fn parses_valid_response() {
        let c = parse_response(&json!({ "label": "Doorbell", "confidence": 0.87 })).unwrap();
        assert_eq!(c.label, "Doorbell");
        assert!((c.confidence - 0.87).abs() < 1e-6);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let err = parse_response(&json!({ "label": "Siren", "confidence": 1.5 })).unwrap_err();
        assert!(matches!(err, ClassifierError::Parse(_)));
        let err = parse_response(&json!({ "label": "Siren", "confidence": -0.1 })).unwrap_err();
        assert!(matches!(err, ClassifierError::Parse(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_response(&json!({ "confidence": 0.5 })).is_err());
        assert!(parse_response(&json!({ "label": "  ", "confidence": 0.5 })).is_err());
        assert!(parse_response(&json!({ "label": "Dog" })).is_err());
    }

    #[test]
    fn window_serializes_as_wire_body() {
        let body = serde_json::to_value(AudioWindow::new(16_000, vec![0.5, -0.25])).unwrap();
        assert_eq!(body, json!({ "sample_rate": 16000, "samples": [0.5, -0.25] }));
    }
}
