//! Pipeline: the single owner of all mutable sound-compass state.
//!
//! # Architecture
//!
//! ```text
//! AudioCapture (cpal) ──AudioChunk──▶ FrameAssembler ──AudioFrame──┐
//!                                                                  ▼
//!                                       SoundPipeline::ingest()  (capture thread)
//!                                                                  │
//!                                                    PendingEvent (mpsc)
//!                                                                  ▼
//!                                    ClassificationWorker::run()  (tokio task)
//!                                                                  │
//!                                              SoundPipeline::complete()
//!                                                                  │
//!                               AlertFeed (snapshot / query) + broadcast subscribers
//!
//! SharedPipeline (Arc<Mutex<SoundPipeline>>) ←── shared by both sides
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use sound_compass::classify::UnavailableClassifier;
//! use sound_compass::config::AppConfig;
//! use sound_compass::pipeline::{lock_pipeline, new_shared_pipeline, ClassificationWorker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let pipeline = new_shared_pipeline(&config).unwrap();
//!
//!     let (pending_tx, pending_rx) = mpsc::channel(32);
//!     let worker = ClassificationWorker::new(
//!         Arc::clone(&pipeline),
//!         Arc::new(UnavailableClassifier),
//!         Duration::from_millis(config.classifier.timeout_ms),
//!     );
//!     tokio::spawn(worker.run(pending_rx));
//!
//!     let mut alerts = lock_pipeline(&pipeline).subscribe();
//!     // frames: lock_pipeline(&pipeline).ingest(&frame) → pending_tx.send(..)
//!     # drop(pending_tx);
//!     while let Ok(alert) = alerts.recv().await {
//!         println!("{}", alert.description());
//!     }
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{classify_with_timeout, ClassificationWorker, PendingEvent, SoundPipeline};
pub use state::{
    lock_pipeline, new_shared_pipeline, PipelinePhase, PipelineStatus, SharedPipeline,
};
