//! Microphone-array capture via `cpal`.
//!
//! [`AudioCapture::open`] picks the input device named in the
//! [`ArrayConfig`] (or the system default) and negotiates a stream with
//! exactly one channel per configured microphone at the array's sample rate.
//! Inter-channel timing must survive untouched, so a device that cannot
//! deliver that layout is rejected rather than resampled or remixed.
//!
//! [`AudioCapture::start`] streams interleaved [`AudioChunk`]s over an mpsc
//! channel; feed them through a [`FrameAssembler`](crate::audio::FrameAssembler)
//! to obtain per-channel frames.  Dropping the returned [`StreamHandle`]
//! stops the stream.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use std::sync::mpsc;
use thiserror::Error;

use crate::config::ArrayConfig;

/// Interleaved `f32` samples from one cpal callback, one sample per
/// microphone per sample-frame.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

/// Keeps the cpal stream alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device {0:?} not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to list input configurations: {0}")]
    Configs(#[from] cpal::SupportedStreamConfigsError),

    #[error("input device {device:?} cannot capture {channels} f32 channels at {sample_rate} Hz")]
    Unsupported {
        device: String,
        channels: u16,
        sample_rate: u32,
    },

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// `true` when `range` can stream `channels` f32 channels at `sample_rate`.
fn range_fits(range: &SupportedStreamConfigRange, channels: u16, sample_rate: u32) -> bool {
    range.channels() == channels
        && range.sample_format() == SampleFormat::F32
        && (range.min_sample_rate().0..=range.max_sample_rate().0).contains(&sample_rate)
}

/// Input stream matched to a microphone array.
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use sound_compass::audio::{AudioCapture, AudioChunk};
/// use sound_compass::config::AppConfig;
///
/// let (tx, rx) = mpsc::channel::<AudioChunk>();
/// let capture = AudioCapture::open(&AppConfig::default().array).unwrap();
/// let _handle = capture.start(tx).unwrap();
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    device_name: String,
    config: cpal::StreamConfig,
}

impl AudioCapture {
    /// Open the configured input device with one channel per microphone at
    /// `array.sample_rate`.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] / [`CaptureError::DeviceNotFound`] when no
    /// matching input exists, and [`CaptureError::Unsupported`] when the
    /// device offers no f32 configuration with that layout.
    pub fn open(array: &ArrayConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match array.input_device.as_deref() {
            None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
        };
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let channels = u16::try_from(array.mics.len()).unwrap_or(u16::MAX);
        let sample_rate = array.sample_rate;
        let range = device
            .supported_input_configs()?
            .find(|r| range_fits(r, channels, sample_rate))
            .ok_or_else(|| CaptureError::Unsupported {
                device: device_name.clone(),
                channels,
                sample_rate,
            })?;

        let config: cpal::StreamConfig = range.with_sample_rate(cpal::SampleRate(sample_rate)).into();
        log::info!("capture: {device_name:?}, {channels} ch @ {sample_rate} Hz");

        Ok(Self {
            device,
            device_name,
            config,
        })
    }

    /// Start streaming into `tx`.
    ///
    /// The cpal callback runs on its own audio thread and never blocks; once
    /// the receiver is gone chunks are discarded.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        let device_name = self.device_name.clone();
        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(AudioChunk {
                    samples: data.to_vec(),
                });
            },
            move |err: cpal::StreamError| log::error!("capture {device_name:?}: {err}"),
            None,
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
