//! External sound classification.
//!
//! * [`SoundClassifier`]: async trait implemented by every backend.
//! * [`HttpClassifier`]: JSON-over-HTTP service client.
//! * [`UnavailableClassifier`]: used when classification is disabled.
//!
//! The pipeline treats classifiers as a black box with arbitrary latency;
//! timeouts are applied by the caller (see [`crate::pipeline`]).

pub mod classifier;
pub mod http;

use std::sync::Arc;

pub use classifier::{
    AudioWindow, Classification, ClassifierError, SoundClassifier, UnavailableClassifier,
};
pub use http::HttpClassifier;

use crate::config::ClassifierConfig;

/// Pick a backend from config.
pub fn from_config(config: &ClassifierConfig) -> Arc<dyn SoundClassifier> {
    if config.enabled {
        log::info!("Sound classifier: {}", config.base_url);
        Arc::new(HttpClassifier::from_config(config))
    } else {
        log::info!("Sound classifier disabled; alerts will be labelled unknown");
        Arc::new(UnavailableClassifier)
    }
}
