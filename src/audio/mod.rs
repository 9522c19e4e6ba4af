//! Signal ingest: array capture → frames → lockstep energy traces.
//!
//! # Pipeline
//!
//! ```text
//! Microphone array → cpal callback → AudioChunk (mpsc) → FrameAssembler
//!                  → AudioFrame → EnergyTraces (RMS per channel per frame)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use sound_compass::audio::{AudioFrame, EnergyTraces};
//!
//! let mut traces = EnergyTraces::new(4, 480, 16_000, 256);
//! let frame = AudioFrame::new(0, 16_000, vec![vec![0.1; 480]; 4]);
//! traces.ingest(&frame).unwrap();
//! assert_eq!(traces.len(), 1);
//! ```

pub mod buffer;
pub mod capture;
pub mod frame;
pub mod ingest;

pub use buffer::RingBuffer;
pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use frame::{mixdown, rms, AudioFrame, FrameAssembler};
pub use ingest::{ChannelEnergyTrace, ChannelMismatch, EnergyTraces};
