//! Interactive recording session.
//!
//! Runs the session screen around one [`CaptureController`]: record or pick a
//! file, upload it, and read the predicted emotion. Uploads run as tokio tasks
//! so the screen keeps rendering while a request is in flight. SIGUSR1 toggles
//! recording from outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::{Backend, HttpBackend, PredictRequest, Prediction};
use crate::capture::{bytes_to_samples, MicrophoneSource};
use crate::config::EmovoxConfig;
use crate::controller::{CaptureController, UploadOutcome};
use crate::history::{data_dir, PredictionHistory};
use crate::playback;
use crate::ui::{SessionCommand, SessionStatus, SessionTui, SessionView};

type Controller = CaptureController<MicrophoneSource, SessionView>;

/// An upload whose response has not been handled yet.
struct PendingUpload {
    source: &'static str,
    file_name: String,
    task: JoinHandle<anyhow::Result<Prediction>>,
}

/// Handles the interactive recording session.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the terminal cannot be initialized or rendered
pub async fn handle_record(server: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== emovox Session Started ===");

    let config = EmovoxConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {e}");
        anyhow::anyhow!("Configuration error: {e}")
    })?;
    let base_url = server.unwrap_or_else(|| config.server.base_url.clone());

    tracing::info!(
        "Configuration loaded: server={}, device={}, sample_rate={}Hz",
        base_url,
        config.audio.device,
        config.audio.sample_rate
    );

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&base_url));
    let source = MicrophoneSource::new(config.audio.device.clone(), config.audio.sample_rate);
    let mut controller = CaptureController::new(
        source,
        backend,
        SessionView::default(),
        std::env::temp_dir(),
    );
    let mut history = PredictionHistory::new(&data_dir()?)?;

    let toggle = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&toggle))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    let mut tui = SessionTui::new(config.audio.reference_level_db)?;
    let mut pending: Vec<PendingUpload> = Vec::new();
    let mut player: Option<std::process::Child> = None;

    loop {
        if toggle.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: toggling recording");
            if controller.is_recording() {
                controller.stop_recording();
            } else {
                start_recording(&mut controller);
            }
        }

        if controller.poll_fragments() > 0 {
            let rate = controller
                .capture_format()
                .map_or(config.audio.sample_rate, |format| format.sample_rate);
            if let Some(latest) = controller.fragments().last() {
                tui.push_samples(&bytes_to_samples(latest), rate);
            }
        }

        let mut still_pending = Vec::with_capacity(pending.len());
        for upload in pending.drain(..) {
            if upload.task.is_finished() {
                finish_upload(&mut controller, &mut history, upload).await;
            } else {
                still_pending.push(upload);
            }
        }
        pending = still_pending;

        let status = SessionStatus {
            recording: controller.is_recording(),
            recorded_secs: controller.clip().map(|clip| clip.duration_secs()),
            uploads_in_flight: pending.len(),
        };
        tui.draw(controller.view(), status)?;

        let alert_open = controller.view().alert.is_some();
        match tui.handle_input(alert_open)? {
            SessionCommand::Continue => {}
            SessionCommand::DismissAlert => controller.view_mut().alert = None,
            SessionCommand::StartRecording => {
                if controller.controls().start_enabled {
                    start_recording(&mut controller);
                }
            }
            SessionCommand::StopRecording => {
                if controller.controls().stop_enabled {
                    controller.stop_recording();
                }
            }
            SessionCommand::ChooseFile(path) => {
                controller.view_mut().file_input = Some(path.display().to_string());
                controller.select_file(path);
            }
            SessionCommand::Upload => {
                if controller.controls().upload_enabled {
                    if let Some(request) = controller.begin_upload() {
                        pending.push(spawn_upload(controller.backend(), request));
                    }
                }
            }
            SessionCommand::Play => match controller.view().playback.clone() {
                Some(path) => {
                    if let Some(mut previous) = player.take() {
                        let _ = previous.kill();
                    }
                    match playback::play(&path) {
                        Ok(child) => player = Some(child),
                        Err(e) => {
                            tracing::warn!("Playback failed: {}", e);
                            controller.view_mut().status = Some(format!("Playback failed: {e}"));
                        }
                    }
                }
                None => tracing::debug!("Nothing recorded to play yet"),
            },
            SessionCommand::Quit => break,
        }
    }

    if controller.is_recording() {
        controller.stop_recording();
    }
    if !pending.is_empty() {
        tracing::info!("Leaving with {} upload(s) still in flight", pending.len());
    }
    tui.cleanup()?;

    tracing::info!("=== emovox Session Exited ===");
    Ok(())
}

fn start_recording(controller: &mut Controller) {
    match controller.start_recording() {
        Ok(()) => controller.view_mut().status = None,
        Err(e) => {
            tracing::error!("Failed to start recording: {:#}", e);
            controller.view_mut().status = Some(format!("Microphone unavailable: {e}"));
        }
    }
}

fn spawn_upload(backend: Arc<dyn Backend>, request: PredictRequest) -> PendingUpload {
    let source = request.source.as_str();
    let file_name = request.audio.file_name();
    let task = tokio::spawn(async move { backend.predict(request).await });
    PendingUpload {
        source,
        file_name,
        task,
    }
}

async fn finish_upload(
    controller: &mut Controller,
    history: &mut PredictionHistory,
    upload: PendingUpload,
) {
    let result = match upload.task.await {
        Ok(result) => result,
        Err(e) => Err(anyhow::anyhow!("Upload task failed: {e}")),
    };

    if let UploadOutcome::Predicted(prediction) = controller.finish_upload(result) {
        save_prediction(history, &prediction, upload.source, &upload.file_name);
    }
}

/// Stores a prediction that named an emotion. Failures are only logged.
pub(crate) fn save_prediction(
    history: &mut PredictionHistory,
    prediction: &Prediction,
    source: &str,
    file_name: &str,
) {
    let Some(emotion) = prediction.detected_emotion() else {
        return;
    };
    if let Err(e) = history.save_prediction(emotion, prediction.confidence, source, file_name) {
        tracing::warn!("Failed to save prediction to history: {}", e);
    }
}
