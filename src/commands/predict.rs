//! One-shot prediction for an audio file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{AudioBody, Backend, HttpBackend, UploadSource};
use crate::capture::MicrophoneSource;
use crate::config::EmovoxConfig;
use crate::controller::{CaptureController, Location, UploadOutcome, View};
use crate::history::{data_dir, PredictionHistory};

use super::record::save_prediction;

/// Prints controller output to the terminal.
#[derive(Debug, Default)]
pub(crate) struct ConsoleView;

impl View for ConsoleView {
    fn set_recording_controls(&mut self, _start_enabled: bool, _stop_enabled: bool) {}

    fn set_upload_ready(&mut self, _ready: bool) {}

    fn set_playback(&mut self, _path: &Path) {}

    fn clear_file_input(&mut self) {}

    fn show_result(&mut self, text: &str) {
        println!("{text}");
    }

    fn show_probabilities(&mut self, probabilities: &[(String, f64)]) {
        for (label, pct) in probabilities {
            println!("  {label:<10} {pct:>6.2}%");
        }
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn navigate(&mut self, location: Location) {
        tracing::debug!("Ignoring navigation to {}", location.path());
    }
}

/// Uploads `file` for emotion prediction and prints the result.
///
/// Exits with status 1 when the request cannot be completed.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the file does not exist
pub async fn handle_predict(file: PathBuf, server: Option<String>) -> Result<(), anyhow::Error> {
    if !file.exists() {
        return Err(anyhow::anyhow!("Audio file not found: {}", file.display()));
    }

    let config = EmovoxConfig::load()?;
    let base_url = server.unwrap_or_else(|| config.server.base_url.clone());
    tracing::info!("Predicting emotion for {} via {}", file.display(), base_url);

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&base_url));
    let source = MicrophoneSource::new(config.audio.device.clone(), config.audio.sample_rate);
    let mut controller =
        CaptureController::new(source, backend, ConsoleView, std::env::temp_dir());

    controller.select_file(file);
    let file_name = controller
        .selected_file()
        .map(|selected| AudioBody::File(selected.path.clone()).file_name())
        .unwrap_or_default();

    match controller.upload().await {
        Some(UploadOutcome::Predicted(prediction)) => {
            match PredictionHistory::new(&data_dir()?) {
                Ok(mut history) => save_prediction(
                    &mut history,
                    &prediction,
                    UploadSource::Uploaded.as_str(),
                    &file_name,
                ),
                Err(e) => tracing::warn!("History unavailable: {}", e),
            }
            Ok(())
        }
        Some(UploadOutcome::Failed) => std::process::exit(1),
        Some(UploadOutcome::NoEmotion) | None => Ok(()),
    }
}
