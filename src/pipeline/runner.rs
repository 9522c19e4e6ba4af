//! Pipeline runner: frame-synchronous ingest plus asynchronous
//! classification.
//!
//! [`SoundPipeline`] owns every piece of mutable state (energy traces,
//! segmenter, pending events, alert feed).  Ingest, segmentation, estimation
//! and fusion run inline on the caller's thread and never block.
//! Classification is decoupled through [`PendingEvent`]s:
//!
//! ```text
//! capture thread                          tokio runtime
//! ──────────────                          ─────────────
//! ingest(frame)
//!   ├─ traces.ingest
//!   ├─ segmenter.observe ─► SoundEvent
//!   ├─ estimator.estimate ─► DirectionEstimate | no-direction
//!   └─ PendingEvent ──(mpsc)──► ClassificationWorker::run
//!                                  └─ per event: timeout(classify)
//!                                        └─ complete(id, outcome)
//!                                              ├─ AlertFusion::fuse
//!                                              ├─ AlertFeed::push
//!                                              └─ broadcast ─► subscribers
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use crate::audio::{mixdown, AudioFrame, ChannelMismatch, EnergyTraces};
use crate::classify::{AudioWindow, ClassifierError, SoundClassifier};
use crate::config::{AppConfig, CalibrationError};
use crate::direction::{DirectionEstimate, DirectionEstimator};
use crate::fusion::{AlertFeed, AlertFusion, AlertPage, AlertQuery, ClassificationOutcome, SoundAlert};
use crate::segment::{EventId, EventSegmenter, SoundEvent};

use super::state::{lock_pipeline, PipelinePhase, PipelineStatus, SharedPipeline};

/// Alerts buffered per subscriber before the slowest one starts lagging.
const ALERT_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// PendingEvent
// ---------------------------------------------------------------------------

/// A finalized event awaiting classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub event: SoundEvent,
    /// `None` when estimation failed; the alert then carries no direction.
    pub direction: Option<DirectionEstimate>,
    /// Mono mixdown of the event's samples.
    pub window: AudioWindow,
}

impl PendingEvent {
    pub fn id(&self) -> EventId {
        self.event.id
    }
}

#[derive(Debug)]
struct Awaiting {
    event: SoundEvent,
    direction: Option<DirectionEstimate>,
}

// ---------------------------------------------------------------------------
// SoundPipeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SoundPipeline {
    traces: EnergyTraces,
    segmenter: EventSegmenter,
    estimator: DirectionEstimator,
    fusion: AlertFusion,
    pending: HashMap<EventId, Awaiting>,
    feed: AlertFeed,
    alerts_tx: broadcast::Sender<SoundAlert>,
    frames_ingested: u64,
}

impl SoundPipeline {
    /// Build a pipeline from validated configuration.
    ///
    /// # Errors
    ///
    /// [`CalibrationError`] when the geometry or thresholds are malformed;
    /// the pipeline refuses to start.
    pub fn new(config: &AppConfig) -> Result<Self, CalibrationError> {
        config.validate()?;

        let array = &config.array;
        let (alerts_tx, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        log::info!(
            "pipeline: {} mics, {} Hz, {}-sample frames",
            array.mics.len(),
            array.sample_rate,
            array.frame_size
        );

        Ok(Self {
            traces: EnergyTraces::new(
                array.mics.len(),
                array.frame_size,
                array.sample_rate,
                array.trace_capacity,
            ),
            segmenter: EventSegmenter::new(config.segmentation.clone()),
            estimator: DirectionEstimator::from_config(config),
            fusion: AlertFusion::new(&config.fusion),
            pending: HashMap::new(),
            feed: AlertFeed::new(config.fusion.recent_alerts_capacity),
            alerts_tx,
            frames_ingested: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    /// Fold one frame into the traces and run segmentation.
    ///
    /// Returns the event finalized by this frame, already registered as
    /// pending; hand it to a [`ClassificationWorker`].
    ///
    /// # Errors
    ///
    /// [`ChannelMismatch`] when the frame does not fit the array; the traces
    /// are left untouched.
    pub fn ingest(&mut self, frame: &AudioFrame) -> Result<Option<PendingEvent>, ChannelMismatch> {
        self.traces.ingest(frame)?;
        self.frames_ingested += 1;

        let Some(event) = self.segmenter.observe(&self.traces) else {
            return Ok(None);
        };

        let frames = event.span_frames.min(self.traces.len());
        let waveforms = self.traces.recent_waveforms(frames);

        let direction = match self.estimator.estimate_with_waveforms(&event, Some(waveforms.as_slice())) {
            Ok(estimate) => {
                log::debug!(
                    "pipeline: event {} at {:.1}° (confidence {:.2}, {:?})",
                    event.id,
                    estimate.angle_degrees,
                    estimate.confidence,
                    estimate.distance_class
                );
                Some(estimate)
            }
            Err(e) => {
                log::warn!("pipeline: event {} has no direction: {e}", event.id);
                None
            }
        };

        let pending = PendingEvent {
            window: AudioWindow::new(self.traces.sample_rate(), mixdown(&waveforms)),
            event: event.clone(),
            direction,
        };
        self.pending.insert(event.id, Awaiting { event, direction });
        Ok(Some(pending))
    }

    // -----------------------------------------------------------------------
    // Classification results
    // -----------------------------------------------------------------------

    /// Fuse a pending event with its classification outcome.
    ///
    /// Each event is completed at most once; unknown or already completed ids
    /// return `None`.
    pub fn complete(&mut self, event_id: EventId, outcome: ClassificationOutcome) -> Option<SoundAlert> {
        let Some(awaiting) = self.pending.remove(&event_id) else {
            log::debug!("pipeline: ignoring outcome for unknown event {event_id}");
            return None;
        };

        let alert = self.fusion.fuse(&awaiting.event, awaiting.direction, &outcome);
        log::info!(
            "alert {}: {} [{}] confidence {:.2}",
            alert.id,
            alert.description(),
            alert.priority.label(),
            alert.confidence
        );

        self.feed.push(alert.clone());
        // No subscribers is fine; the feed still holds the alert.
        let _ = self.alerts_tx.send(alert.clone());
        Some(alert)
    }

    /// Fuse every outstanding event as `unknown`, oldest first.
    pub fn flush_pending(&mut self) -> Vec<SoundAlert> {
        let mut ids: Vec<EventId> = self.pending.keys().copied().collect();
        ids.sort_unstable();
        if !ids.is_empty() {
            log::info!("pipeline: flushing {} pending event(s)", ids.len());
        }
        ids.into_iter()
            .filter_map(|id| self.complete(id, ClassificationOutcome::Failed("cancelled".into())))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Consumers
    // -----------------------------------------------------------------------

    /// Copy of the retained alerts, oldest first.
    pub fn alerts(&self) -> Vec<SoundAlert> {
        self.feed.snapshot()
    }

    pub fn query(&self, query: &AlertQuery) -> AlertPage {
        self.feed.query(query)
    }

    /// Receive every alert created from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SoundAlert> {
        self.alerts_tx.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn status(&self) -> PipelineStatus {
        let phase = if self.segmenter.is_calibrating() {
            PipelinePhase::Calibrating
        } else if self.segmenter.is_active() {
            PipelinePhase::EventActive
        } else {
            PipelinePhase::Listening
        };
        PipelineStatus {
            phase,
            frames_ingested: self.frames_ingested,
            pending_events: self.pending.len(),
            retained_alerts: self.feed.len(),
            thresholds: self.segmenter.thresholds().map(|t| (t.onset, t.offset)),
        }
    }
}

// ---------------------------------------------------------------------------
// ClassificationWorker
// ---------------------------------------------------------------------------

/// Classifies pending events concurrently and completes them on the shared
/// pipeline.  Results may arrive in any order.
pub struct ClassificationWorker {
    pipeline: SharedPipeline,
    classifier: Arc<dyn SoundClassifier>,
    timeout: Duration,
}

impl ClassificationWorker {
    pub fn new(pipeline: SharedPipeline, classifier: Arc<dyn SoundClassifier>, timeout: Duration) -> Self {
        Self {
            pipeline,
            classifier,
            timeout,
        }
    }

    /// Run until `rx` is closed and every in-flight classification has
    /// completed.
    pub async fn run(self, mut rx: mpsc::Receiver<PendingEvent>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(pending) => {
                        let pipeline = Arc::clone(&self.pipeline);
                        let classifier = Arc::clone(&self.classifier);
                        let timeout = self.timeout;
                        tasks.spawn(async move {
                            let id = pending.id();
                            let outcome = classify_with_timeout(classifier.as_ref(), &pending.window, timeout).await;
                            lock_pipeline(&pipeline).complete(id, outcome);
                        });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        log::warn!("classification task failed: {e}");
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::warn!("classification task failed: {e}");
            }
        }
        log::info!("classification worker: channel closed, shutting down");
    }
}

/// Run one classification under `timeout`.  Never fails: timeouts and
/// classifier errors become fallback outcomes.
pub async fn classify_with_timeout(
    classifier: &dyn SoundClassifier,
    window: &AudioWindow,
    timeout: Duration,
) -> ClassificationOutcome {
    match tokio::time::timeout(timeout, classifier.classify(window)).await {
        Ok(Ok(classification)) => ClassificationOutcome::Classified(classification),
        Ok(Err(ClassifierError::Timeout)) | Err(_) => {
            log::warn!("classifier timed out after {} ms", timeout.as_millis());
            ClassificationOutcome::TimedOut
        }
        Ok(Err(ClassifierError::Unavailable)) => {
            ClassificationOutcome::Failed(ClassifierError::Unavailable.to_string())
        }
        Ok(Err(e)) => {
            log::warn!("classifier failed: {e}");
            ClassificationOutcome::Failed(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
