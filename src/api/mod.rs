//! Prediction and account API.
//!
//! The [`Backend`] trait is the seam between the capture controller and the
//! remote server. [`HttpBackend`] is the reqwest implementation used by the
//! application; tests substitute scripted backends.

mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use http::HttpBackend;

/// Where an uploaded clip came from, sent as the `type` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    /// Captured from the microphone in this session
    Recorded,
    /// A file chosen by the user
    Uploaded,
}

impl UploadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Uploaded => "uploaded",
        }
    }
}

impl std::fmt::Display for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio carried in the `file` part of a prediction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioBody {
    /// Encoded clip bytes held in memory
    Bytes {
        file_name: String,
        mime: String,
        data: Vec<u8>,
    },
    /// A file on disk, read when the request is sent
    File(PathBuf),
}

impl AudioBody {
    /// File name announced in the multipart part.
    pub fn file_name(&self) -> String {
        match self {
            Self::Bytes { file_name, .. } => file_name.clone(),
            Self::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}

/// One `/predict` submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictRequest {
    pub audio: AudioBody,
    pub source: UploadSource,
}

/// Body returned by `/predict`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub emotion: Option<String>,
    /// Already a percentage (0-100)
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    /// Per-emotion percentages
    #[serde(default, deserialize_with = "lenient")]
    pub probabilities: Option<BTreeMap<String, f64>>,
}

/// Reads an optional extra field; a value of the wrong shape becomes `None`
/// instead of failing the whole response.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl Prediction {
    /// The detected emotion, if the server reported a non-empty one.
    pub fn detected_emotion(&self) -> Option<&str> {
        self.emotion.as_deref().filter(|emotion| !emotion.is_empty())
    }

    /// Confidence worth displaying. Zero counts as absent.
    pub fn displayed_confidence(&self) -> Option<f64> {
        self.confidence.filter(|c| *c != 0.0 && !c.is_nan())
    }
}

/// Email and password sent to `/signup` and `/login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body returned by `/signup` and `/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
}

/// Remote endpoints used by the client.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Uploads one clip to `/predict`.
    ///
    /// # Errors
    /// - If the audio cannot be read, the request fails, or the body is not JSON
    async fn predict(&self, request: PredictRequest) -> Result<Prediction>;

    /// Creates an account through `/signup`.
    async fn signup(&self, credentials: &Credentials) -> Result<AuthResponse>;

    /// Authenticates through `/login`.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse>;
}
