//! Pipeline phase and the shared pipeline handle.
//!
//! [`SharedPipeline`] is a type alias for `Arc<Mutex<SoundPipeline>>`: the
//! capture thread ingests through it, classification tasks complete events
//! through it, and consumers read snapshots through it.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::config::{AppConfig, CalibrationError};

use super::runner::SoundPipeline;

// ---------------------------------------------------------------------------
// PipelinePhase
// ---------------------------------------------------------------------------

/// Segmentation phase of the pipeline.
///
/// ```text
/// Calibrating ──ambient frames collected──▶ Listening
/// Listening   ──energy > onset──────────▶ EventActive
/// EventActive ──energy < offset, sustained──▶ Listening
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Measuring the ambient noise floor; no events can start yet.
    #[default]
    Calibrating,
    Listening,
    EventActive,
}

impl PipelinePhase {
    /// ```
    /// use sound_compass::pipeline::PipelinePhase;
    ///
    /// assert_eq!(PipelinePhase::EventActive.label(), "Event");
    /// ```
    pub fn label(&self) -> &'static str {
        match self {
            PipelinePhase::Calibrating => "Calibrating",
            PipelinePhase::Listening => "Listening",
            PipelinePhase::EventActive => "Event",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineStatus
// ---------------------------------------------------------------------------

/// Point-in-time summary for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub phase: PipelinePhase,
    pub frames_ingested: u64,
    /// Events waiting for a classification outcome.
    pub pending_events: usize,
    /// Alerts currently retained in the feed.
    pub retained_alerts: usize,
    /// Active `(onset, offset)` thresholds; `None` while calibrating.
    pub thresholds: Option<(f32, f32)>,
}

// ---------------------------------------------------------------------------
// SharedPipeline
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SoundPipeline`].
///
/// Cheap to clone.  Keep critical sections short and never hold the lock
/// across `.await` points.
pub type SharedPipeline = Arc<Mutex<SoundPipeline>>;

/// Validate `config` and wrap a fresh pipeline.
pub fn new_shared_pipeline(config: &AppConfig) -> Result<SharedPipeline, CalibrationError> {
    Ok(Arc::new(Mutex::new(SoundPipeline::new(config)?)))
}

/// Lock the pipeline, recovering the guard if a previous holder panicked.
pub fn lock_pipeline(pipeline: &SharedPipeline) -> MutexGuard<'_, SoundPipeline> {
    pipeline.lock().unwrap_or_else(|poisoned| {
        log::warn!("pipeline: mutex was poisoned; continuing with inner state");
        poisoned.into_inner()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phase_is_calibrating() {
        assert_eq!(PipelinePhase::default(), PipelinePhase::Calibrating);
    }

    #[test]
    fn labels() {
        assert_eq!(PipelinePhase::Calibrating.label(), "Calibrating");
        assert_eq!(PipelinePhase::Listening.label(), "Listening");
    }

    #[test]
    fn shared_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedPipeline>();
    }

    #[test]
    fn new_shared_pipeline_validates() {
        let mut config = AppConfig::default();
        config.array.mics.clear();
        let err = new_shared_pipeline(&config).unwrap_err();
        assert_eq!(err.field, "array.mics");
    }

    #[test]
    fn shared_pipeline_can_be_cloned_and_read() {
        let pipeline = new_shared_pipeline(&AppConfig::default()).unwrap();
        let other = Arc::clone(&pipeline);
        assert_eq!(lock_pipeline(&other).status().phase, PipelinePhase::Calibrating);
        assert_eq!(lock_pipeline(&pipeline).status().frames_ingested, 0);
    }
}
