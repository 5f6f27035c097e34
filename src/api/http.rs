//! reqwest implementation of the prediction and account endpoints.

use anyhow::anyhow;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::Path;

use super::{AudioBody, AuthResponse, Backend, Credentials, PredictRequest, Prediction};

/// HTTP client for a prediction server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a client for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_credentials(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> anyhow::Result<AuthResponse> {
        let url = self.url(path);
        tracing::debug!(
            "Account API Call:\n  URL: {}\n  Method: POST\n  Body: {{ email: {}, password: <redacted> }}",
            url,
            credentials.email
        );

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| describe_send_error(&url, e))?;

        read_json(response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn predict(&self, request: PredictRequest) -> anyhow::Result<Prediction> {
        let file_name = request.audio.file_name();
        let file_part = match request.audio {
            AudioBody::Bytes { file_name, mime, data } => {
                reqwest::multipart::Part::bytes(data)
                    .file_name(file_name)
                    .mime_str(&mime)
                    .map_err(|e| anyhow!("Failed to create file part for upload: {e}"))?
            }
            AudioBody::File(path) => {
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    anyhow!("Failed to read audio file {}: {e}", path.display())
                })?;
                let part = reqwest::multipart::Part::bytes(data).file_name(file_name.clone());
                match audio_mime(&path) {
                    Some(mime) => part
                        .mime_str(mime)
                        .map_err(|e| anyhow!("Failed to create file part for upload: {e}"))?,
                    None => part,
                }
            }
        };

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("type", request.source.as_str());

        let url = self.url("/predict");
        tracing::debug!(
            "Prediction API Call:\n  URL: {}\n  Method: POST\n  Content-Type: multipart/form-data\n  Body parameters: file={}, type={}",
            url,
            file_name,
            request.source
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| describe_send_error(&url, e))?;

        let status = response.status();
        let prediction: Prediction = read_json(response).await?;

        tracing::debug!(
            "Prediction API Response:\n  Status: {}\n  Full response: {:#?}",
            status,
            prediction
        );

        Ok(prediction)
    }

    async fn signup(&self, credentials: &Credentials) -> anyhow::Result<AuthResponse> {
        self.post_credentials("/signup", credentials).await
    }

    async fn login(&self, credentials: &Credentials) -> anyhow::Result<AuthResponse> {
        self.post_credentials("/login", credentials).await
    }
}

/// Parses a JSON body regardless of the HTTP status.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response body: {e}"))?;

    serde_json::from_str(&body).map_err(|e| {
        anyhow!("Server returned a non-JSON response (status {status}): {e}")
    })
}

/// Content type announced for a chosen file, from its extension.
fn audio_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "ogg" | "oga" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "m4a" => Some("audio/mp4"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}

fn describe_send_error(url: &str, e: reqwest::Error) -> anyhow::Error {
    if e.is_connect() {
        anyhow!("Failed to connect to {url}. Check that the server is running.")
    } else if e.is_timeout() {
        anyhow!("Request to {url} timed out.")
    } else if e.is_builder() {
        anyhow!("Failed to build request for {url}: {e}. Check server.base_url in the config.")
    } else {
        anyhow!("Network error talking to {url}: {e}")
    }
}
