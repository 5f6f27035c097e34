//! Choosing the upload source and rendering prediction results.

use anyhow::Result;

use super::SelectedFile;
use crate::api::{AudioBody, PredictRequest, Prediction, UploadSource};
use crate::capture::{Clip, CLIP_FILE_NAME};

pub const NO_SOURCE_ALERT: &str = "No audio selected or recorded!";
pub const NO_EMOTION_MESSAGE: &str = "⚠️ Error: No emotion detected!";
pub const PROCESSING_ERROR_MESSAGE: &str = "⚠️ Error processing the request!";

/// How a finished upload turned out.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The server named an emotion
    Predicted(Prediction),
    /// The server answered without an emotion
    NoEmotion,
    /// The request or the response parsing failed
    Failed,
}

/// Picks the recorded clip over the selected file. `None` when neither exists.
///
/// # Errors
/// - If the recorded clip cannot be encoded as WAV
pub(super) fn build_request(
    clip: Option<&Clip>,
    selected: Option<&SelectedFile>,
) -> Result<Option<PredictRequest>> {
    if let Some(clip) = clip {
        return Ok(Some(PredictRequest {
            audio: AudioBody::Bytes {
                file_name: CLIP_FILE_NAME.to_string(),
                mime: clip.mime().to_string(),
                data: clip.to_wav()?,
            },
            source: UploadSource::Recorded,
        }));
    }

    Ok(selected.map(|file| PredictRequest {
        audio: AudioBody::File(file.path.clone()),
        source: UploadSource::Uploaded,
    }))
}

/// Result line for a prediction response.
pub fn result_text(prediction: &Prediction) -> String {
    match prediction.detected_emotion() {
        Some(emotion) => {
            let confidence = prediction
                .displayed_confidence()
                .map(|c| format!(" ({c:.2}% confidence)"))
                .unwrap_or_default();
            format!("🎭 Predicted Emotion: {emotion}{confidence}")
        }
        None => NO_EMOTION_MESSAGE.to_string(),
    }
}
