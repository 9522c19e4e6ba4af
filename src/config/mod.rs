//! Configuration module: array geometry, calibration thresholds and user
//! preferences.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per pipeline
//! stage, `AppPaths` for the platform config directory, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and start-up validation via
//! `AppConfig::validate`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ArrayConfig, CalibrationError, ClassifierConfig, EstimationConfig, FusionConfig,
    SegmentationConfig,
};
