//! Audio capture and upload controller.
//!
//! One [`CaptureController`] lives for the whole session. It owns the recorder
//! handle, the fragments of the running capture, the last recorded clip and the
//! file the user picked, and reacts to the session's triggers: start, stop,
//! file selection, upload and the account forms. Everything the user sees goes
//! through the [`View`] trait.

mod forms;
mod upload;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{Backend, PredictRequest, Prediction};
use crate::capture::{AudioSource, CaptureSession, Clip, ClipFormat};

pub use forms::{submit_login, submit_signup, Location};
pub use upload::{result_text, UploadOutcome, NO_SOURCE_ALERT, PROCESSING_ERROR_MESSAGE};

/// File name of the playable copy of the last recording. Carries the process
/// id so concurrent sessions sharing a temp dir keep separate copies.
pub fn playback_file_name() -> String {
    format!("emovox-recording-{}.wav", std::process::id())
}

/// The user-facing surface the controller drives.
pub trait View {
    /// Enables or disables the start and stop recording controls.
    fn set_recording_controls(&mut self, start_enabled: bool, stop_enabled: bool);

    /// Enables the upload control and its active indicator, or disables both.
    fn set_upload_ready(&mut self, ready: bool);

    /// Points the playback control at a playable copy of the recording.
    fn set_playback(&mut self, path: &Path);

    /// Clears the file chooser.
    fn clear_file_input(&mut self);

    /// Replaces the result text.
    fn show_result(&mut self, text: &str);

    /// Per-emotion percentages from the last prediction.
    fn show_probabilities(&mut self, _probabilities: &[(String, f64)]) {}

    /// Blocking notice to the user.
    fn alert(&mut self, message: &str);

    /// Moves the user to another location.
    fn navigate(&mut self, location: Location);
}

/// A file chosen by the user as the upload source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
}

/// Enablement of the session's controls, as last pushed to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub upload_enabled: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            start_enabled: true,
            stop_enabled: false,
            upload_enabled: false,
        }
    }
}

/// Owns capture and upload state for one session.
pub struct CaptureController<S: AudioSource, V: View> {
    source: S,
    backend: Arc<dyn Backend>,
    view: V,
    /// Where the playable WAV copy of a recording is written
    playback_dir: PathBuf,
    session: Option<S::Session>,
    fragments: Vec<Vec<u8>>,
    clip: Option<Clip>,
    selected: Option<SelectedFile>,
    controls: Controls,
}

impl<S: AudioSource, V: View> CaptureController<S, V> {
    pub fn new(source: S, backend: Arc<dyn Backend>, view: V, playback_dir: PathBuf) -> Self {
        Self {
            source,
            backend,
            view,
            playback_dir,
            session: None,
            fragments: Vec::new(),
            clip: None,
            selected: None,
            controls: Controls::default(),
        }
    }

    /// Opens a capture session and switches the controls to recording.
    ///
    /// # Errors
    /// - If the microphone cannot be opened; controls are left as they were
    pub fn start_recording(&mut self) -> Result<()> {
        let session = self.source.open()?;
        let format = session.format();

        self.session = Some(session);
        self.fragments.clear();
        tracing::info!(
            "Recording started ({}Hz, {} channel)",
            format.sample_rate,
            format.channels
        );

        self.set_recording_controls(false, true);
        Ok(())
    }

    /// Appends the fragments the running session delivered since the last poll.
    ///
    /// Returns how many fragments were appended.
    pub fn poll_fragments(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let fresh = session.take_fragments();
        let count = fresh.len();
        self.fragments.extend(fresh);
        count
    }

    /// Ends the running capture, if any, and always resets the recording controls.
    pub fn stop_recording(&mut self) {
        if let Some(mut session) = self.session.take() {
            if session.is_active() {
                if let Err(e) = session.stop() {
                    tracing::warn!("Failed to stop capture cleanly: {}", e);
                }
                self.fragments.extend(session.take_fragments());
                self.on_capture_stopped(session.format());
            }
        }

        self.set_recording_controls(true, false);
    }

    /// Assembles the clip, exposes a playable copy and marks upload ready.
    fn on_capture_stopped(&mut self, format: ClipFormat) {
        let clip = Clip::assemble(&self.fragments, format);
        tracing::info!(
            "Recording stopped: {:.2}s ({} fragments, {} bytes)",
            clip.duration_secs(),
            self.fragments.len(),
            clip.data().len()
        );

        let playback_path = self.playback_dir.join(playback_file_name());
        match clip.write_wav(&playback_path) {
            Ok(()) => self.view.set_playback(&playback_path),
            Err(e) => tracing::warn!("Failed to write playback file: {}", e),
        }

        self.clip = Some(clip);
        self.refresh_upload_ready();
    }

    /// Records the user's file choice and marks upload ready. No validation.
    pub fn select_file(&mut self, path: PathBuf) {
        tracing::info!("Audio file selected: {}", path.display());
        self.selected = Some(SelectedFile { path });
        self.refresh_upload_ready();
    }

    /// Builds the next prediction request and clears the file selection.
    ///
    /// Returns `None` after alerting the user when there is nothing to upload.
    pub fn begin_upload(&mut self) -> Option<PredictRequest> {
        let request = match upload::build_request(self.clip.as_ref(), self.selected.as_ref()) {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!("Upload requested with no recording or file");
                self.view.alert(NO_SOURCE_ALERT);
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to encode recording: {}", e);
                self.view.show_result(PROCESSING_ERROR_MESSAGE);
                return None;
            }
        };

        tracing::info!(
            "Uploading {} audio: {}",
            request.source,
            request.audio.file_name()
        );

        self.view.clear_file_input();
        self.selected = None;
        Some(request)
    }

    /// Renders the result of a finished prediction request.
    pub fn finish_upload(&mut self, outcome: Result<Prediction>) -> UploadOutcome {
        match outcome {
            Ok(prediction) => {
                tracing::debug!("Prediction response: {:?}", prediction);
                if let Some(detail) = prediction.error.as_deref().or(prediction.message.as_deref()) {
                    tracing::debug!("Server note: {}", detail);
                }

                self.view.show_result(&result_text(&prediction));
                if let Some(probabilities) = &prediction.probabilities {
                    let mut ranked: Vec<(String, f64)> = probabilities
                        .iter()
                        .map(|(label, pct)| (label.clone(), *pct))
                        .collect();
                    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                    self.view.show_probabilities(&ranked);
                }

                self.controls.upload_enabled = false;
                self.view.set_upload_ready(false);

                if prediction.detected_emotion().is_some() {
                    UploadOutcome::Predicted(prediction)
                } else {
                    UploadOutcome::NoEmotion
                }
            }
            Err(e) => {
                tracing::error!("Prediction request failed: {:#}", e);
                self.view.show_result(PROCESSING_ERROR_MESSAGE);
                UploadOutcome::Failed
            }
        }
    }

    /// Uploads the active source and waits for the prediction.
    pub async fn upload(&mut self) -> Option<UploadOutcome> {
        let request = self.begin_upload()?;
        let outcome = self.backend.predict(request).await;
        Some(self.finish_upload(outcome))
    }

    /// Whether a recorded clip or a selected file is available.
    pub fn upload_ready(&self) -> bool {
        self.clip.is_some() || self.selected.is_some()
    }

    /// PCM layout of the running capture, `None` when idle.
    pub fn capture_format(&self) -> Option<ClipFormat> {
        self.session.as_ref().map(|s| s.format())
    }

    pub fn is_recording(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    pub fn clip(&self) -> Option<&Clip> {
        self.clip.as_ref()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    fn set_recording_controls(&mut self, start_enabled: bool, stop_enabled: bool) {
        self.controls.start_enabled = start_enabled;
        self.controls.stop_enabled = stop_enabled;
        self.view.set_recording_controls(start_enabled, stop_enabled);
    }

    fn refresh_upload_ready(&mut self) {
        let ready = self.upload_ready();
        self.controls.upload_enabled = ready;
        self.view.set_upload_ready(ready);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::upload::NO_EMOTION_MESSAGE;
    use super::*;
    use crate::api::{AudioBody, UploadSource};

    fn controller(
        source: ScriptedSource,
        backend: Arc<ScriptedBackend>,
        dir: &Path,
    ) -> CaptureController<ScriptedSource, RecordingView> {
        CaptureController::new(source, backend, RecordingView::default(), dir.to_path_buf())
    }

    #[test]
    fn test_start_and_stop_toggle_controls() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::with_sessions(vec![vec![vec![vec![1, 0]]]]);
        let mut c = controller(source, Arc::new(ScriptedBackend::default()), dir.path());

        c.start_recording().unwrap();
        assert!(c.is_recording());
        assert!(!c.controls().start_enabled);
        assert!(c.controls().stop_enabled);

        c.stop_recording();
        assert!(!c.is_recording());
        assert_eq!(c.view().controls, vec![(false, true), (true, false)]);
        assert!(c.controls().upload_enabled);
        assert_eq!(c.view().upload_ready, vec![true]);
    }

    #[test]
    fn test_clip_is_concatenation_of_fragments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::with_sessions(vec![vec![
            vec![vec![1, 2], vec![3, 4]],
            vec![],
            vec![vec![5, 6]],
            vec![vec![7, 8]],
        ]]);
        let mut c = controller(source, Arc::new(ScriptedBackend::default()), dir.path());

        c.start_recording().unwrap();
        assert_eq!(c.poll_fragments(), 2);
        assert_eq!(c.poll_fragments(), 0);
        assert_eq!(c.poll_fragments(), 1);
        c.stop_recording();

        assert_eq!(c.clip().unwrap().data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        let playback = c.view().playback.clone().unwrap();
        assert_eq!(playback, dir.path().join(playback_file_name()));
        let reader = hound::WavReader::open(&playback).unwrap();
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn test_start_resets_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::with_sessions(vec![
            vec![vec![vec![9, 9]], vec![vec![8, 8]]],
            vec![vec![vec![1, 1]]],
        ]);
        let mut c = controller(source, Arc::new(ScriptedBackend::default()), dir.path());

        c.start_recording().unwrap();
        c.poll_fragments();
        c.stop_recording();
        assert_eq!(c.clip().unwrap().data(), &[9, 9, 8, 8]);

        c.start_recording().unwrap();
        assert!(c.fragments().is_empty());
        c.stop_recording();
        assert_eq!(c.clip().unwrap().data(), &[1, 1]);
    }

    #[test]
    fn test_stop_without_start_only_resets_controls() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::default());
        let mut c = controller(ScriptedSource::default(), backend.clone(), dir.path());

        c.stop_recording();
        c.stop_recording();

        assert_eq!(c.view().controls, vec![(true, false), (true, false)]);
        assert!(c.clip().is_none());
        assert!(c.view().upload_ready.is_empty());
        assert_eq!(backend.request_count(), 0);
    }

    #[test]
    fn test_microphone_denied_leaves_controls() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource {
            deny: true,
            ..ScriptedSource::default()
        };
        let mut c = controller(source, Arc::new(ScriptedBackend::default()), dir.path());

        assert!(c.start_recording().is_err());
        assert!(c.view().controls.is_empty());
        assert_eq!(c.controls(), Controls::default());
    }

    #[test]
    fn test_select_file_marks_upload_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(
            ScriptedSource::default(),
            Arc::new(ScriptedBackend::default()),
            dir.path(),
        );
        assert!(!c.upload_ready());

        c.select_file(PathBuf::from("notes.txt"));
        assert!(c.upload_ready());
        assert_eq!(c.view().upload_ready, vec![true]);
        assert!(c.controls().upload_enabled);
    }

    #[tokio::test]
    async fn test_upload_without_source_alerts_and_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::predicting("{}"));
        let mut c = controller(ScriptedSource::default(), backend.clone(), dir.path());

        assert!(c.upload().await.is_none());
        assert_eq!(c.view().alerts, vec![NO_SOURCE_ALERT.to_string()]);
        assert_eq!(backend.request_count(), 0);
        assert_eq!(c.view().file_input_clears, 0);
    }

    #[tokio::test]
    async fn test_recorded_clip_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::predicting(
            r#"{"emotion": "happy", "confidence": 87.5}"#,
        ));
        let source = ScriptedSource::with_sessions(vec![vec![vec![vec![1, 0, 2, 0]]]]);
        let mut c = controller(source, backend.clone(), dir.path());

        c.select_file(dir.path().join("chosen.wav"));
        c.start_recording().unwrap();
        c.stop_recording();

        let outcome = c.upload().await.unwrap();
        assert!(matches!(outcome, UploadOutcome::Predicted(_)));

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source, UploadSource::Recorded);
        match &requests[0].audio {
            AudioBody::Bytes { file_name, mime, data } => {
                assert_eq!(file_name, "recording.wav");
                assert_eq!(mime, "audio/wav");
                assert_eq!(&data[0..4], b"RIFF");
            }
            other => panic!("expected in-memory clip, got {other:?}"),
        }
        drop(requests);

        assert!(c.selected_file().is_none());
        assert_eq!(c.view().file_input_clears, 1);
    }

    #[tokio::test]
    async fn test_selected_file_upload_and_result_text() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::predicting(
            r#"{"emotion": "happy", "confidence": 87.5, "probabilities": {"happy": 87.5, "sad": 2.5, "calm": 10.0}}"#,
        ));
        let mut c = controller(ScriptedSource::default(), backend.clone(), dir.path());

        let path = dir.path().join("voice.mp3");
        c.select_file(path.clone());
        c.upload().await.unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].source, UploadSource::Uploaded);
        assert_eq!(requests[0].audio, AudioBody::File(path));

        let result = c.view().results.last().unwrap();
        assert!(result.contains("happy"));
        assert!(result.contains("87.50% confidence"));
        assert_eq!(c.view().probabilities[0].0, "happy");
        assert_eq!(c.view().probabilities[1].0, "calm");
    }

    #[tokio::test]
    async fn test_malformed_extra_fields_still_render_emotion() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::predicting(
            r#"{"emotion": "happy", "confidence": 87.5, "error": {"code": 7}, "probabilities": {"happy": "87.5"}}"#,
        ));
        let mut c = controller(ScriptedSource::default(), backend, dir.path());

        c.select_file(dir.path().join("a.wav"));
        let outcome = c.upload().await.unwrap();

        assert!(matches!(outcome, UploadOutcome::Predicted(_)));
        assert_eq!(
            c.view().results,
            vec!["🎭 Predicted Emotion: happy (87.50% confidence)".to_string()]
        );
        assert!(c.view().probabilities.is_empty());
        assert_eq!(c.view().upload_ready, vec![true, false]);
        assert!(!c.controls().upload_enabled);
    }

    #[test]
    fn test_capture_format_follows_session() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::with_sessions(vec![vec![vec![vec![1, 0]]]]);
        let mut c = controller(source, Arc::new(ScriptedBackend::default()), dir.path());

        assert_eq!(c.capture_format(), None);
        c.start_recording().unwrap();
        assert_eq!(c.capture_format(), Some(ClipFormat::default()));
        c.stop_recording();
        assert_eq!(c.capture_format(), None);
    }

    #[test]
    fn test_playback_file_name_is_per_process() {
        let name = playback_file_name();
        assert!(name.contains(&std::process::id().to_string()));
        assert!(name.ends_with(".wav"));
    }

    #[tokio::test]
    async fn test_empty_response_renders_no_emotion_and_disables_upload() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::predicting("{}"));
        let mut c = controller(ScriptedSource::default(), backend, dir.path());

        c.select_file(dir.path().join("a.wav"));
        let outcome = c.upload().await.unwrap();

        assert!(matches!(outcome, UploadOutcome::NoEmotion));
        assert_eq!(c.view().results, vec![NO_EMOTION_MESSAGE.to_string()]);
        assert_eq!(c.view().upload_ready, vec![true, false]);
        assert!(!c.controls().upload_enabled);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_upload_state_but_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::default());
        let mut c = controller(ScriptedSource::default(), backend.clone(), dir.path());

        c.select_file(dir.path().join("a.wav"));
        let outcome = c.upload().await.unwrap();

        assert!(matches!(outcome, UploadOutcome::Failed));
        assert_eq!(c.view().results, vec![PROCESSING_ERROR_MESSAGE.to_string()]);
        assert_eq!(c.view().upload_ready, vec![true]);
        assert!(c.controls().upload_enabled);
        assert!(c.selected_file().is_none());
        assert_eq!(c.view().file_input_clears, 1);
        assert_eq!(backend.request_count(), 1);
    }

    #[test]
    fn test_selection_cleared_when_request_is_issued() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(
            ScriptedSource::default(),
            Arc::new(ScriptedBackend::default()),
            dir.path(),
        );

        c.select_file(dir.path().join("a.wav"));
        let request = c.begin_upload().unwrap();

        assert_eq!(request.source, UploadSource::Uploaded);
        assert!(c.selected_file().is_none());
        assert_eq!(c.view().file_input_clears, 1);
        assert!(c.view().results.is_empty());
    }

    #[test]
    fn test_recorded_clip_survives_upload() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::with_sessions(vec![vec![vec![vec![0, 1]]]]);
        let mut c = controller(source, Arc::new(ScriptedBackend::default()), dir.path());

        c.start_recording().unwrap();
        c.stop_recording();
        c.begin_upload().unwrap();
        c.finish_upload(Ok(Prediction::default()));

        assert!(c.clip().is_some());
        assert!(c.upload_ready());
        assert!(!c.controls().upload_enabled);
    }
}
