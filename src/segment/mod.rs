//! Event segmentation: turns lockstep energy traces into discrete
//! [`SoundEvent`]s using an onset/offset hysteresis pair, a debounce interval
//! and a minimum event length.
//!
//! Thresholds are either fixed in configuration or calibrated from the
//! ambient noise floor during the first frames after start-up.

pub mod calibration;
pub mod segmenter;

pub use calibration::{NoiseFloor, Thresholds};
pub use segmenter::{EventId, EventSegmenter, SoundEvent};
