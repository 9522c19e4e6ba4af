//! Calibration and preference structs, defaults, validation and TOML
//! persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it overrides.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;
use crate::direction::MicPosition;

// ---------------------------------------------------------------------------
// CalibrationError
// ---------------------------------------------------------------------------

/// A geometry or threshold value that makes the pipeline unusable.
///
/// Raised by [`AppConfig::validate`]; the pipeline refuses to start.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid calibration `{field}`: {reason}")]
pub struct CalibrationError {
    pub field: &'static str,
    pub reason: String,
}

impl CalibrationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ArrayConfig
// ---------------------------------------------------------------------------

/// Microphone array geometry and framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    /// Capture sample rate in Hz shared by every channel.
    pub sample_rate: u32,
    /// Samples per channel per frame (480 = 30 ms at 16 kHz).
    pub frame_size: usize,
    /// Frames kept in each energy trace.
    pub trace_capacity: usize,
    /// Speed of sound used by the time-difference strategy, in m/s.
    pub speed_of_sound_mps: f32,
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
    /// Microphone placements, in channel order.
    pub mics: Vec<MicPosition>,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_size: 480,
            trace_capacity: 256,
            speed_of_sound_mps: 343.0,
            input_device: None,
            mics: [0.0, 90.0, 180.0, 270.0]
                .into_iter()
                .map(|angle| MicPosition::new(angle, 0.05))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentationConfig
// ---------------------------------------------------------------------------

/// Onset/offset hysteresis and event length limits.
///
/// When `onset_threshold` / `offset_threshold` are `None` they are derived
/// from the ambient noise floor measured over the first
/// `calibration_frames` frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Fixed onset energy; `None` = calibrate from ambient noise.
    pub onset_threshold: Option<f32>,
    /// Fixed offset energy; `None` = derive from the onset threshold.
    pub offset_threshold: Option<f32>,
    /// Frames of ambient noise measured before detection starts.
    pub calibration_frames: usize,
    /// `onset = ambient_mean + ambient_k · ambient_stddev`.
    pub ambient_k: f32,
    /// Offset position between ambient mean (0.0) and onset (1.0).
    pub offset_ratio: f32,
    /// Floor for a calibrated onset threshold (keeps digital silence from
    /// producing a zero threshold).
    pub min_onset_threshold: f32,
    /// Consecutive quiet frames required to finalize an event.
    pub debounce_frames: usize,
    /// Events shorter than this many frames are discarded as noise.
    pub min_event_frames: usize,
    /// Events are force-finalized after this many frames.
    pub max_event_frames: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            onset_threshold: None,
            offset_threshold: None,
            calibration_frames: 25,
            ambient_k: 4.0,
            offset_ratio: 0.5,
            min_onset_threshold: 0.01,
            debounce_frames: 5,
            min_event_frames: 3,
            max_event_frames: 400,
        }
    }
}

// ---------------------------------------------------------------------------
// EstimationConfig
// ---------------------------------------------------------------------------

/// Direction confidence and distance bucket calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Estimates below this confidence are flagged indeterminate.
    pub reporting_threshold: f32,
    /// Peak energy at or above which a sound is `near`.
    pub near_energy: f32,
    /// Peak energy below which a sound is `far`.
    pub far_energy: f32,
    /// Try cross-correlation on the raw waveforms before level differences.
    pub prefer_time_difference: bool,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            reporting_threshold: 0.2,
            near_energy: 0.25,
            far_energy: 0.05,
            prefer_time_difference: true,
        }
    }
}

// ---------------------------------------------------------------------------
// FusionConfig
// ---------------------------------------------------------------------------

/// Labelling and alert retention preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Classifications below this confidence are labelled "Unknown sound".
    pub min_label_confidence: f32,
    /// Recent alerts retained for consumers; oldest evicted first.
    pub recent_alerts_capacity: usize,
    /// Labels the user always wants raised to at least `important`.
    pub important_sounds: Vec<String>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            min_label_confidence: 0.3,
            recent_alerts_capacity: 100,
            important_sounds: ["doorbell", "alarm", "phone", "name_called"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ClassifierConfig
// ---------------------------------------------------------------------------

/// External sound classification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// When `false`, every event is labelled `unknown` without a request.
    pub enabled: bool,
    /// Base URL of the service; requests go to `{base_url}/classify`.
    pub base_url: String,
    /// Per-event classification deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:5000".into(),
            timeout_ms: 2_000,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use sound_compass::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub array: ArrayConfig,
    pub segmentation: SegmentationConfig,
    pub estimation: EstimationConfig,
    pub fusion: FusionConfig,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check geometry and thresholds before the pipeline is built.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let a = &self.array;
        if a.mics.is_empty() {
            return Err(CalibrationError::new("array.mics", "at least one microphone is required"));
        }
        for (i, mic) in a.mics.iter().enumerate() {
            if !mic.angle_degrees.is_finite() || !mic.radius_m.is_finite() || mic.radius_m < 0.0 {
                return Err(CalibrationError::new(
                    "array.mics",
                    format!("microphone {i} has an invalid placement {mic:?}"),
                ));
            }
        }
        if a.sample_rate == 0 {
            return Err(CalibrationError::new("array.sample_rate", "must be > 0"));
        }
        if a.frame_size == 0 {
            return Err(CalibrationError::new("array.frame_size", "must be > 0"));
        }
        if a.trace_capacity == 0 {
            return Err(CalibrationError::new("array.trace_capacity", "must be > 0"));
        }
        if !(a.speed_of_sound_mps.is_finite() && a.speed_of_sound_mps > 0.0) {
            return Err(CalibrationError::new("array.speed_of_sound_mps", "must be > 0"));
        }

        let s = &self.segmentation;
        if let (Some(on), Some(off)) = (s.onset_threshold, s.offset_threshold) {
            if off >= on {
                return Err(CalibrationError::new(
                    "segmentation.offset_threshold",
                    format!("offset {off} must be below onset {on}"),
                ));
            }
        }
        // A zero onset would derive a zero offset, collapsing the hysteresis.
        if s.onset_threshold.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
            return Err(CalibrationError::new(
                "segmentation.onset_threshold",
                "must be a positive number",
            ));
        }
        if s.offset_threshold.is_some_and(|v| !(v.is_finite() && v >= 0.0)) {
            return Err(CalibrationError::new(
                "segmentation.offset_threshold",
                "must be a non-negative number",
            ));
        }
        if s.onset_threshold.is_none() && s.calibration_frames == 0 {
            return Err(CalibrationError::new(
                "segmentation.calibration_frames",
                "must be > 0 when no onset threshold is configured",
            ));
        }
        if !(s.offset_ratio > 0.0 && s.offset_ratio < 1.0) {
            return Err(CalibrationError::new("segmentation.offset_ratio", "must be in (0, 1)"));
        }
        if !(s.ambient_k.is_finite() && s.ambient_k >= 0.0) {
            return Err(CalibrationError::new("segmentation.ambient_k", "must be >= 0"));
        }
        if !(s.min_onset_threshold.is_finite() && s.min_onset_threshold > 0.0) {
            return Err(CalibrationError::new("segmentation.min_onset_threshold", "must be > 0"));
        }
        if s.debounce_frames == 0 {
            return Err(CalibrationError::new("segmentation.debounce_frames", "must be > 0"));
        }
        if s.min_event_frames == 0 {
            return Err(CalibrationError::new("segmentation.min_event_frames", "must be > 0"));
        }
        if s.max_event_frames < s.min_event_frames {
            return Err(CalibrationError::new(
                "segmentation.max_event_frames",
                "must be >= min_event_frames",
            ));
        }

        let e = &self.estimation;
        if !(0.0..=1.0).contains(&e.reporting_threshold) {
            return Err(CalibrationError::new("estimation.reporting_threshold", "must be in [0, 1]"));
        }
        if !(e.far_energy.is_finite() && e.near_energy.is_finite() && e.near_energy > e.far_energy)
        {
            return Err(CalibrationError::new(
                "estimation.near_energy",
                format!("near {} must exceed far {}", e.near_energy, e.far_energy),
            ));
        }

        let f = &self.fusion;
        if !(0.0..=1.0).contains(&f.min_label_confidence) {
            return Err(CalibrationError::new("fusion.min_label_confidence", "must be in [0, 1]"));
        }
        if f.recent_alerts_capacity == 0 {
            return Err(CalibrationError::new("fusion.recent_alerts_capacity", "must be > 0"));
        }

        if self.classifier.enabled && self.classifier.timeout_ms == 0 {
            return Err(CalibrationError::new("classifier.timeout_ms", "must be > 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        let angles: Vec<f32> = cfg.array.mics.iter().map(|m| m.angle_degrees).collect();
        assert_eq!(angles, vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(cfg.array.sample_rate, 16_000);
        assert_eq!(cfg.array.frame_size, 480);
        assert_eq!(cfg.segmentation.debounce_frames, 5);
        assert_eq!(cfg.segmentation.min_event_frames, 3);
        assert!(cfg.segmentation.onset_threshold.is_none());
        assert_eq!(cfg.fusion.recent_alerts_capacity, 100);
        assert!(cfg.fusion.important_sounds.contains(&"doorbell".to_string()));
        assert!(!cfg.classifier.enabled);
    }

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = AppConfig::default();
        original.segmentation.onset_threshold = Some(0.2);
        original.segmentation.offset_threshold = Some(0.1);
        original.array.input_device = Some("ReSpeaker".into());
        original.classifier.enabled = true;
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.segmentation.onset_threshold, Some(0.2));
        assert_eq!(loaded.segmentation.offset_threshold, Some(0.1));
        assert_eq!(loaded.array.input_device.as_deref(), Some("ReSpeaker"));
        assert_eq!(loaded.array.mics, original.array.mics);
        assert!(loaded.classifier.enabled);
        assert_eq!(loaded.fusion.important_sounds, original.fusion.important_sounds);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let config = AppConfig::load_from(&dir.path().join("nope.toml")).expect("no error");
        assert_eq!(config.array.sample_rate, AppConfig::default().array.sample_rate);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[array]\nsample_rate = 48000\n\n[[array.mics]]\nangle_degrees = 0.0\nradius_m = 0.1\n\n[[array.mics]]\nangle_degrees = 180.0\nradius_m = 0.1\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.array.sample_rate, 48_000);
        assert_eq!(cfg.array.mics.len(), 2);
        assert_eq!(cfg.array.frame_size, 480);
        assert_eq!(cfg.segmentation.debounce_frames, 5);
    }

    #[test]
    fn offset_above_onset_rejected() {
        let mut cfg = AppConfig::default();
        cfg.segmentation.onset_threshold = Some(0.1);
        cfg.segmentation.offset_threshold = Some(0.2);
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.field, "segmentation.offset_threshold");
    }

    #[test]
    fn zero_onset_rejected() {
        let mut cfg = AppConfig::default();
        cfg.segmentation.onset_threshold = Some(0.0);
        assert_eq!(cfg.validate().unwrap_err().field, "segmentation.onset_threshold");

        cfg.segmentation.onset_threshold = Some(-0.1);
        assert_eq!(cfg.validate().unwrap_err().field, "segmentation.onset_threshold");

        cfg.segmentation.onset_threshold = Some(0.05);
        cfg.segmentation.offset_threshold = Some(0.0);
        cfg.validate().expect("zero offset below a positive onset is fine");
    }

    #[test]
    fn zero_min_onset_rejected() {
        let mut cfg = AppConfig::default();
        cfg.segmentation.min_onset_threshold = 0.0;
        assert_eq!(cfg.validate().unwrap_err().field, "segmentation.min_onset_threshold");
    }

    #[test]
    fn empty_geometry_rejected() {
        let mut cfg = AppConfig::default();
        cfg.array.mics.clear();
        assert_eq!(cfg.validate().unwrap_err().field, "array.mics");
    }

    #[test]
    fn non_finite_mic_rejected() {
        let mut cfg = AppConfig::default();
        cfg.array.mics[1].angle_degrees = f32::NAN;
        assert_eq!(cfg.validate().unwrap_err().field, "array.mics");
    }

    #[test]
    fn inverted_distance_buckets_rejected() {
        let mut cfg = AppConfig::default();
        cfg.estimation.near_energy = 0.01;
        assert_eq!(cfg.validate().unwrap_err().field, "estimation.near_energy");
    }

    #[test]
    fn zero_debounce_rejected() {
        let mut cfg = AppConfig::default();
        cfg.segmentation.debounce_frames = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("debounce_frames"), "{err}");
    }
}
