//! Energy hysteresis state machine that cuts discrete sound events out of the
//! energy traces.
//!
//! ```text
//! Calibrating ──calibration_frames──▶ Idle
//! Idle   ──mean energy > onset──────────────────────▶ Active
//! Active ──energy ≥ offset: update peak────────────▶ Active
//! Active ──energy < offset for debounce_frames─────▶ Idle   (emit if long enough)
//! Active ──max_event_frames reached────────────────▶ Idle   (emit)
//! ```
//!
//! One event is active per array at a time.

use serde::Serialize;

use crate::audio::EnergyTraces;
use crate::config::SegmentationConfig;

use super::calibration::{NoiseFloor, Thresholds};

/// Identifier shared by an event, its pending classification and its alert.
pub type EventId = u64;

// ---------------------------------------------------------------------------
// SoundEvent
// ---------------------------------------------------------------------------

/// A contiguous period of above-threshold energy.
///
/// `offset_ms` is `None` while the event is active and set exactly once when
/// it is finalized; finalized events are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundEvent {
    pub id: EventId,
    pub onset_ms: u64,
    pub offset_ms: Option<u64>,
    /// Highest mean-across-channels energy seen while active.
    pub peak_energy: f32,
    /// Per-channel energy in the frame where `peak_energy` was reached.
    pub channel_peaks: Vec<f32>,
    /// Frames from onset through the last frame at or above the offset.
    pub active_frames: usize,
    /// Frames from onset through finalization, debounce tail included.
    pub span_frames: usize,
}

impl SoundEvent {
    pub fn is_finalized(&self) -> bool {
        self.offset_ms.is_some()
    }

    /// Event duration in milliseconds (0 while active).
    pub fn duration_ms(&self) -> u64 {
        self.offset_ms
            .map_or(0, |offset| offset.saturating_sub(self.onset_ms))
    }
}

// ---------------------------------------------------------------------------
// EventSegmenter
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ActiveEvent {
    event: SoundEvent,
    /// Consecutive frames below the offset threshold.
    quiet_run: usize,
    /// Timestamp of the first frame of the current quiet run.
    quiet_since: u64,
}

#[derive(Debug)]
enum State {
    Calibrating(NoiseFloor),
    Idle,
    Active(ActiveEvent),
}

/// Per-array event segmenter.
///
/// Call [`observe`](Self::observe) once after every ingested frame.
#[derive(Debug)]
pub struct EventSegmenter {
    config: SegmentationConfig,
    thresholds: Option<Thresholds>,
    state: State,
    next_id: EventId,
}

impl EventSegmenter {
    /// Build a segmenter; it starts in calibration unless the configuration
    /// fixes the onset threshold.
    pub fn new(config: SegmentationConfig) -> Self {
        let thresholds = Thresholds::from_config(&config);
        let state = match thresholds {
            Some(_) => State::Idle,
            None => State::Calibrating(NoiseFloor::new()),
        };
        Self {
            config,
            thresholds,
            state,
            next_id: 1,
        }
    }

    /// Inspect the newest frame in `traces`; returns an event when one is
    /// finalized by this frame.
    pub fn observe(&mut self, traces: &EnergyTraces) -> Option<SoundEvent> {
        let energies = traces.latest_energies()?;
        let timestamp = traces.latest_timestamp()?;
        if energies.is_empty() {
            return None;
        }
        let mean = energies.iter().sum::<f32>() / energies.len() as f32;

        match &mut self.state {
            State::Calibrating(floor) => {
                floor.add(mean);
                if floor.count() >= self.config.calibration_frames {
                    let t = Thresholds::from_ambient(floor, &self.config);
                    log::info!(
                        "segmenter: ambient {:.4} ± {:.4} → onset {:.4}, offset {:.4}",
                        floor.mean(),
                        floor.stddev(),
                        t.onset,
                        t.offset
                    );
                    self.thresholds = Some(t);
                    self.state = State::Idle;
                }
                None
            }

            State::Idle => {
                let t = self.thresholds?;
                if mean > t.onset {
                    let id = self.next_id;
                    self.next_id += 1;
                    log::debug!("segmenter: event {id} onset at {timestamp} ms (energy {mean:.4})");
                    self.state = State::Active(ActiveEvent {
                        event: SoundEvent {
                            id,
                            onset_ms: timestamp,
                            offset_ms: None,
                            peak_energy: mean,
                            channel_peaks: energies,
                            active_frames: 1,
                            span_frames: 1,
                        },
                        quiet_run: 0,
                        quiet_since: timestamp,
                    });
                }
                None
            }

            State::Active(active) => {
                let t = self.thresholds?;
                active.event.span_frames += 1;

                if mean >= t.offset {
                    active.quiet_run = 0;
                    active.event.active_frames = active.event.span_frames;
                    if mean > active.event.peak_energy {
                        active.event.peak_energy = mean;
                        active.event.channel_peaks = energies;
                    }
                } else {
                    if active.quiet_run == 0 {
                        active.quiet_since = timestamp;
                    }
                    active.quiet_run += 1;
                }

                if active.quiet_run >= self.config.debounce_frames {
                    let offset = active.quiet_since;
                    self.finalize(offset)
                } else if active.event.span_frames >= self.config.max_event_frames {
                    log::debug!("segmenter: event {} hit max length", active.event.id);
                    self.finalize(timestamp)
                } else {
                    None
                }
            }
        }
    }

    /// Leave the Active state, returning the event unless it is too short.
    fn finalize(&mut self, offset_ms: u64) -> Option<SoundEvent> {
        let State::Active(active) = std::mem::replace(&mut self.state, State::Idle) else {
            return None;
        };
        let mut event = active.event;

        if event.active_frames < self.config.min_event_frames {
            log::debug!(
                "segmenter: discarding event {} ({} frames < {})",
                event.id,
                event.active_frames,
                self.config.min_event_frames
            );
            return None;
        }

        event.offset_ms = Some(offset_ms);
        Some(event)
    }

    /// Current thresholds; `None` while calibrating.
    pub fn thresholds(&self) -> Option<Thresholds> {
        self.thresholds
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.state, State::Calibrating(_))
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// The in-progress event, if any (its `offset_ms` is `None`).
    pub fn active_event(&self) -> Option<&SoundEvent> {
        match &self.state {
            State::Active(active) => Some(&active.event),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
