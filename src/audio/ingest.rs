//! Signal ingest: folds each [`AudioFrame`] into per-channel energy traces.
//!
//! [`EnergyTraces`] keeps all channels in lockstep: one shared timestamp ring
//! plus one [`ChannelEnergyTrace`] (RMS per frame) and one raw-sample ring per
//! channel.  A frame is validated completely before anything is written, so
//! a rejected frame leaves every trace untouched.

use thiserror::Error;

use super::buffer::RingBuffer;
use super::frame::{rms, AudioFrame};

// ---------------------------------------------------------------------------
// ChannelMismatch
// ---------------------------------------------------------------------------

/// A frame that does not match the array configuration.
///
/// Returned by [`EnergyTraces::ingest`]; the offending frame is dropped and
/// the traces are left as they were.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelMismatch {
    #[error("frame has {got} channels, array is configured for {expected}")]
    ChannelCount { expected: usize, got: usize },

    #[error("channel {channel} has {got} samples, expected {expected}")]
    SampleCount {
        channel: usize,
        expected: usize,
        got: usize,
    },

    #[error("frame sample rate {got} Hz does not match array rate {expected} Hz")]
    SampleRate { expected: u32, got: u32 },

    #[error("channel {channel} contains a non-finite sample")]
    NonFinite { channel: usize },
}

// ---------------------------------------------------------------------------
// ChannelEnergyTrace
// ---------------------------------------------------------------------------

/// Bounded, time-ordered RMS energy values for a single channel.
#[derive(Debug, Clone)]
pub struct ChannelEnergyTrace {
    energy: RingBuffer<f32>,
}

impl ChannelEnergyTrace {
    fn new(capacity: usize) -> Self {
        Self {
            energy: RingBuffer::new(capacity),
        }
    }

    /// Newest energy value.
    pub fn latest(&self) -> Option<f32> {
        self.energy.last()
    }

    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EnergyTraces
// ---------------------------------------------------------------------------

/// Lockstep energy and waveform history for every microphone of an array.
#[derive(Debug, Clone)]
pub struct EnergyTraces {
    sample_rate: u32,
    frame_size: usize,
    timestamps: RingBuffer<u64>,
    traces: Vec<ChannelEnergyTrace>,
    /// Raw samples per channel; holds `capacity` frames worth.
    waveforms: Vec<RingBuffer<f32>>,
}

impl EnergyTraces {
    /// Traces for `channels` microphones keeping the newest `capacity` frames.
    ///
    /// # Panics
    ///
    /// Panics if any argument is zero; configuration validation rejects
    /// those values before this is reached.
    pub fn new(channels: usize, frame_size: usize, sample_rate: u32, capacity: usize) -> Self {
        assert!(channels > 0, "channels must be > 0");
        assert!(frame_size > 0, "frame_size must be > 0");
        Self {
            sample_rate,
            frame_size,
            timestamps: RingBuffer::new(capacity),
            traces: (0..channels).map(|_| ChannelEnergyTrace::new(capacity)).collect(),
            waveforms: (0..channels)
                .map(|_| RingBuffer::new(capacity * frame_size))
                .collect(),
        }
    }

    /// Append one energy sample per channel for `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelMismatch`] when the channel count, per-channel sample
    /// count or sample rate differs from the configuration, or when a sample
    /// is NaN/infinite.  Nothing is written in that case.
    pub fn ingest(&mut self, frame: &AudioFrame) -> Result<(), ChannelMismatch> {
        self.check(frame)?;

        self.timestamps.push(frame.timestamp_ms);
        for ((trace, wave), samples) in self
            .traces
            .iter_mut()
            .zip(self.waveforms.iter_mut())
            .zip(&frame.channels)
        {
            trace.energy.push(rms(samples));
            wave.push_slice(samples);
        }
        Ok(())
    }

    fn check(&self, frame: &AudioFrame) -> Result<(), ChannelMismatch> {
        if frame.channel_count() != self.traces.len() {
            return Err(ChannelMismatch::ChannelCount {
                expected: self.traces.len(),
                got: frame.channel_count(),
            });
        }
        if frame.sample_rate != self.sample_rate {
            return Err(ChannelMismatch::SampleRate {
                expected: self.sample_rate,
                got: frame.sample_rate,
            });
        }
        for (channel, samples) in frame.channels.iter().enumerate() {
            if samples.len() != self.frame_size {
                return Err(ChannelMismatch::SampleCount {
                    channel,
                    expected: self.frame_size,
                    got: samples.len(),
                });
            }
            if samples.iter().any(|s| !s.is_finite()) {
                return Err(ChannelMismatch::NonFinite { channel });
            }
        }
        Ok(())
    }

    /// Per-channel traces, indexed like the microphone geometry.
    pub fn channels(&self) -> &[ChannelEnergyTrace] {
        &self.traces
    }

    /// Timestamp of the newest frame.
    pub fn latest_timestamp(&self) -> Option<u64> {
        self.timestamps.last()
    }

    /// Newest energy of every channel, or `None` before the first frame.
    pub fn latest_energies(&self) -> Option<Vec<f32>> {
        self.traces.iter().map(ChannelEnergyTrace::latest).collect()
    }

    /// Raw samples of the newest `frames` frames for every channel.
    pub fn recent_waveforms(&self, frames: usize) -> Vec<Vec<f32>> {
        let n = frames.saturating_mul(self.frame_size);
        self.waveforms.iter().map(|w| w.latest(n)).collect()
    }

    /// Number of frames currently held (identical for every channel).
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.traces.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
