//! Direction & distance estimation for finalized sound events.
//!
//! Two strategies, chosen by the data available:
//!
//! | Strategy | Needs | Module |
//! |----------|-------|--------|
//! | Level difference (default) | per-channel energy at peak | [`level`] |
//! | Time difference | synchronised raw waveforms | [`tdoa`] |
//!
//! The time-difference strategy is attempted only when waveforms are given
//! and [`EstimationConfig::prefer_time_difference`] is set; any failure falls
//! back to level differences.  Distance is always bucketed from the event's
//! peak energy.
//!
//! ```
//! use sound_compass::config::AppConfig;
//! use sound_compass::direction::{DirectionEstimator, DistanceClass};
//! use sound_compass::segment::SoundEvent;
//!
//! let estimator = DirectionEstimator::from_config(&AppConfig::default());
//! let event = SoundEvent {
//!     id: 1,
//!     onset_ms: 0,
//!     offset_ms: Some(300),
//!     peak_energy: 0.3,
//!     channel_peaks: vec![0.0, 1.0, 0.0, 0.0],
//!     active_frames: 10,
//!     span_frames: 15,
//! };
//! let est = estimator.estimate(&event).unwrap();
//! assert!((est.angle_degrees - 90.0).abs() < 1e-3);
//! assert_eq!(est.distance_class, DistanceClass::Near);
//! ```

pub mod distance;
pub mod geometry;
pub mod level;
pub mod tdoa;

pub use distance::DistanceClass;
pub use geometry::{bearing, normalize_degrees, CompassPoint, MicPosition};

use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, EstimationConfig};
use crate::segment::SoundEvent;

// ---------------------------------------------------------------------------
// EstimateError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    /// Every channel was silent at the event peak; no bearing exists.
    #[error("insufficient signal: all channels are silent")]
    InsufficientSignal,

    #[error("event has {channels} channel energies but the array has {mics} microphones")]
    GeometryMismatch { channels: usize, mics: usize },
}

// ---------------------------------------------------------------------------
// DirectionEstimate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    LevelDifference,
    TimeDifference,
}

/// Bearing, confidence and distance bucket for one event.  Immutable once
/// computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionEstimate {
    /// Compass bearing in `[0, 360)`.
    pub angle_degrees: f32,
    /// Agreement across channels in `[0, 1]`.
    pub confidence: f32,
    pub distance_class: DistanceClass,
    /// `true` when `confidence` is below the reporting threshold; the angle
    /// is still defined but should not be presented as a direction.
    pub indeterminate: bool,
    pub method: EstimationMethod,
}

impl DirectionEstimate {
    pub fn compass_point(&self) -> CompassPoint {
        CompassPoint::from_degrees(self.angle_degrees as f64)
    }
}

// ---------------------------------------------------------------------------
// DirectionEstimator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DirectionEstimator {
    geometry: Vec<MicPosition>,
    config: EstimationConfig,
    sample_rate: u32,
    speed_of_sound: f32,
}

impl DirectionEstimator {
    pub fn new(
        geometry: Vec<MicPosition>,
        config: EstimationConfig,
        sample_rate: u32,
        speed_of_sound: f32,
    ) -> Self {
        Self {
            geometry,
            config,
            sample_rate,
            speed_of_sound,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.array.mics.clone(),
            cfg.estimation.clone(),
            cfg.array.sample_rate,
            cfg.array.speed_of_sound_mps,
        )
    }

    /// Level-difference estimate from the event's energy-at-peak.
    pub fn estimate(&self, event: &SoundEvent) -> Result<DirectionEstimate, EstimateError> {
        self.estimate_with_waveforms(event, None)
    }

    /// Estimate using raw waveforms when available.
    ///
    /// # Errors
    ///
    /// [`EstimateError::InsufficientSignal`] for an all-silent event, and
    /// [`EstimateError::GeometryMismatch`] when the event's channel count
    /// differs from the array.
    pub fn estimate_with_waveforms(
        &self,
        event: &SoundEvent,
        waveforms: Option<&[Vec<f32>]>,
    ) -> Result<DirectionEstimate, EstimateError> {
        let (level_angle, level_conf) = level::weighted_centroid(&event.channel_peaks, &self.geometry)?;

        let (angle, confidence, method) = if self.geometry.len() < 2 {
            // A single microphone carries no directional information.
            (0.0, 0.0, EstimationMethod::LevelDifference)
        } else {
            let time_difference = waveforms
                .filter(|_| self.config.prefer_time_difference)
                .and_then(|w| {
                    tdoa::estimate_time_difference(
                        w,
                        &self.geometry,
                        self.sample_rate,
                        self.speed_of_sound,
                    )
                });
            match time_difference {
                Some((angle, conf)) => (angle, conf, EstimationMethod::TimeDifference),
                None => (level_angle, level_conf, EstimationMethod::LevelDifference),
            }
        };

        let confidence = confidence as f32;
        let mut angle_degrees = normalize_degrees(angle) as f32;
        // f64 → f32 can round 359.99999999 up to 360.0
        if angle_degrees >= 360.0 {
            angle_degrees = 0.0;
        }

        Ok(DirectionEstimate {
            angle_degrees,
            confidence,
            distance_class: DistanceClass::from_energy(
                event.peak_energy,
                self.config.near_energy,
                self.config.far_energy,
            ),
            indeterminate: confidence < self.config.reporting_threshold,
            method,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
