//! Spatial sound alerts from a microphone array.
//!
//! ```text
//! AudioFrame → audio::EnergyTraces → segment::EventSegmenter
//!            → direction::DirectionEstimator → classify (external)
//!            → fusion::AlertFusion → fusion::AlertFeed
//! ```
//!
//! [`pipeline::SoundPipeline`] owns every stage and is the only holder of
//! mutable state; [`pipeline::ClassificationWorker`] runs the external
//! classifier off the ingest thread.

pub mod audio;
pub mod classify;
pub mod config;
pub mod direction;
pub mod fusion;
pub mod pipeline;
pub mod segment;
