//! Multi-channel audio frames and the assembler that cuts them out of the
//! interleaved capture stream.
//!
//! ```text
//! cpal callback (interleaved, any length) → FrameAssembler
//!     → AudioFrame { channels: [[frame_size]; n], timestamp_ms }
//! ```

// ---------------------------------------------------------------------------
// AudioFrame
// ---------------------------------------------------------------------------

/// A fixed-duration slice of samples for every channel of the array.
///
/// `channels[i]` holds the samples captured by microphone `i`.  All channels
/// cover the same time window, starting at `timestamp_ms` on the capture
/// clock.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Monotonic capture timestamp of the first sample, in milliseconds.
    pub timestamp_ms: u64,
    /// Sample rate shared by all channels, in Hz.
    pub sample_rate: u32,
    /// One sample vector per microphone.
    pub channels: Vec<Vec<f32>>,
}

impl AudioFrame {
    pub fn new(timestamp_ms: u64, sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            timestamp_ms,
            sample_rate,
            channels,
        }
    }

    /// Number of channels in the frame.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Root-mean-square amplitude of `samples` (0.0 for an empty slice).
///
/// ```
/// use sound_compass::audio::rms;
///
/// assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
/// assert_eq!(rms(&[]), 0.0);
/// ```
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

/// Average all channels sample-by-sample into one mono signal.
///
/// Channels shorter than the first are treated as zero-padded.
pub fn mixdown(channels: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = channels.first() else {
        return Vec::new();
    };
    let n = channels.len() as f32;
    (0..first.len())
        .map(|i| channels.iter().filter_map(|ch| ch.get(i)).sum::<f32>() / n)
        .collect()
}

// ---------------------------------------------------------------------------
// FrameAssembler
// ---------------------------------------------------------------------------

/// Splits an interleaved sample stream into fixed-size [`AudioFrame`]s.
///
/// The capture callback delivers buffers of arbitrary length; the assembler
/// carries the remainder over to the next call so frames never straddle a
/// gap.  Timestamps are derived from the number of sample-frames consumed so
/// far, which keeps them monotonic regardless of callback jitter.
///
/// ```
/// use sound_compass::audio::FrameAssembler;
///
/// // 2 channels, 2 samples per frame, 1 kHz
/// let mut asm = FrameAssembler::new(2, 2, 1_000);
/// let frames = asm.push_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0]);
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].channels, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
/// assert_eq!(frames[0].timestamp_ms, 0);
/// ```
#[derive(Debug)]
pub struct FrameAssembler {
    channels: usize,
    frame_size: usize,
    sample_rate: u32,
    /// Interleaved samples not yet emitted.
    pending: Vec<f32>,
    /// Sample-frames emitted so far (per channel).
    emitted: u64,
}

impl FrameAssembler {
    /// # Panics
    ///
    /// Panics if `channels`, `frame_size` or `sample_rate` is zero.
    pub fn new(channels: usize, frame_size: usize, sample_rate: u32) -> Self {
        assert!(channels > 0, "channels must be > 0");
        assert!(frame_size > 0, "frame_size must be > 0");
        assert!(sample_rate > 0, "sample_rate must be > 0");
        Self {
            channels,
            frame_size,
            sample_rate,
            pending: Vec::with_capacity(channels * frame_size * 2),
            emitted: 0,
        }
    }

    /// Append interleaved samples and return every complete frame.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);

        let block = self.channels * self.frame_size;
        let complete = self.pending.len() / block;
        let mut frames = Vec::with_capacity(complete);

        for chunk in self.pending.chunks_exact(block) {
            let mut channels = vec![Vec::with_capacity(self.frame_size); self.channels];
            for sample_frame in chunk.chunks_exact(self.channels) {
                for (ch, &s) in channels.iter_mut().zip(sample_frame) {
                    ch.push(s);
                }
            }
            let timestamp_ms = self.emitted * 1_000 / self.sample_rate as u64;
            frames.push(AudioFrame::new(timestamp_ms, self.sample_rate, channels));
            self.emitted += self.frame_size as u64;
        }

        self.pending.drain(..complete * block);
        frames
    }

    /// Frame duration in milliseconds.
    pub fn frame_duration_ms(&self) -> f32 {
        self.frame_size as f32 * 1_000.0 / self.sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.25_f32; 100]) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn mixdown_averages_channels() {
        let mono = mixdown(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(mono, vec![0.5, 0.5]);
        assert!(mixdown(&[]).is_empty());
    }

    #[test]
    fn assembler_carries_remainder_between_calls() {
        let mut asm = FrameAssembler::new(1, 4, 1_000);
        assert!(asm.push_interleaved(&[1.0, 2.0, 3.0]).is_empty());

        let frames = asm.push_interleaved(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].channels[0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(frames[1].channels[0], vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn assembler_timestamps_follow_sample_count() {
        // 480 samples @ 16 kHz = 30 ms per frame
        let mut asm = FrameAssembler::new(2, 480, 16_000);
        let frames = asm.push_interleaved(&vec![0.0; 2 * 480 * 3]);
        let stamps: Vec<u64> = frames.iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 30, 60]);
        assert!((asm.frame_duration_ms() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn frame_accessors() {
        let frame = AudioFrame::new(10, 16_000, vec![vec![0.0; 8], vec![0.0; 8]]);
        assert_eq!(frame.channel_count(), 2);
        assert_eq!(frame.channels[1].len(), 8);
    }

    #[test]
    #[should_panic(expected = "frame_size must be > 0")]
    fn zero_frame_size_panics() {
        FrameAssembler::new(2, 0, 16_000);
    }
}
