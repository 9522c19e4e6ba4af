//! Application entry point: sound-compass.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (default on first run) and validate it.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the pipeline and the classifier backend.
//! 5. Spawn the classification worker and the alert printer.
//! 6. Open the array's input device (one channel per microphone at the
//!    configured rate) and start the frame-ingest thread.
//! 7. Wait for Ctrl-C, then drain in-flight classifications and flush
//!    anything still pending as `unknown`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};

use sound_compass::{
    audio::{AudioCapture, AudioChunk, FrameAssembler},
    classify,
    config::AppConfig,
    fusion::SoundAlert,
    pipeline::{lock_pipeline, new_shared_pipeline, ClassificationWorker, PendingEvent, SharedPipeline},
};

// ---------------------------------------------------------------------------
// Frame ingest thread
// ---------------------------------------------------------------------------

/// Cut interleaved chunks into frames, ingest them, and forward finalized
/// events to the classification worker.  Returns when the capture stream is
/// dropped or the worker goes away.
fn run_ingest(
    pipeline: SharedPipeline,
    mut assembler: FrameAssembler,
    chunk_rx: std::sync::mpsc::Receiver<AudioChunk>,
    pending_tx: mpsc::Sender<PendingEvent>,
) {
    while let Ok(chunk) = chunk_rx.recv() {
        for frame in assembler.push_interleaved(&chunk.samples) {
            let result = lock_pipeline(&pipeline).ingest(&frame);
            match result {
                Ok(Some(pending)) => {
                    if pending_tx.blocking_send(pending).is_err() {
                        log::warn!("ingest: classification worker stopped");
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("ingest: dropping frame at {} ms: {e}", frame.timestamp_ms),
            }
        }
    }
    log::info!("ingest: capture stream closed");
}

fn print_alert(alert: &SoundAlert) {
    match serde_json::to_string(alert) {
        Ok(line) => println!("{line}"),
        Err(e) => log::warn!("failed to serialise alert {}: {e}", alert.id),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("sound-compass starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    config.validate().context("refusing to start")?;

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // 4. Pipeline + classifier
    let pipeline = new_shared_pipeline(&config)?;
    let classifier = classify::from_config(&config.classifier);

    // 5. Worker + printer
    let (pending_tx, pending_rx) = mpsc::channel::<PendingEvent>(32);
    let worker = tokio::spawn(
        ClassificationWorker::new(
            Arc::clone(&pipeline),
            classifier,
            Duration::from_millis(config.classifier.timeout_ms),
        )
        .run(pending_rx),
    );

    let mut alerts = lock_pipeline(&pipeline).subscribe();
    let (stop_printer, mut stop_rx) = oneshot::channel::<()>();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = alerts.recv() => match received {
                    Ok(alert) => print_alert(&alert),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::warn!("alert printer skipped {n} alert(s)")
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = &mut stop_rx => {
                    while let Ok(alert) = alerts.try_recv() {
                        print_alert(&alert);
                    }
                    break;
                }
            }
        }
    });

    // 6. Capture + ingest thread
    let capture = AudioCapture::open(&config.array)?;
    let mics = config.array.mics.len();

    let (chunk_tx, chunk_rx) = std::sync::mpsc::channel::<AudioChunk>();
    let assembler = FrameAssembler::new(mics, config.array.frame_size, config.array.sample_rate);
    log::info!(
        "{}-sample frames ({:.1} ms)",
        config.array.frame_size,
        assembler.frame_duration_ms()
    );
    let ingest = {
        let pipeline = Arc::clone(&pipeline);
        std::thread::Builder::new()
            .name("frame-ingest".into())
            .spawn(move || run_ingest(pipeline, assembler, chunk_rx, pending_tx))
            .context("failed to spawn frame-ingest thread")?
    };

    let stream = capture.start(chunk_tx)?;
    log::info!(
        "Listening on {:?} ({mics} channels at {} Hz); press Ctrl-C to stop",
        capture.device_name(),
        config.array.sample_rate
    );

    // 7. Shutdown
    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    drop(stream);

    tokio::task::spawn_blocking(move || ingest.join())
        .await?
        .map_err(|_| anyhow::anyhow!("frame-ingest thread panicked"))?;
    worker.await?;
    let _ = stop_printer.send(());
    printer.await?;

    for alert in lock_pipeline(&pipeline).flush_pending() {
        print_alert(&alert);
    }
    Ok(())
}
