//! Speech-to-text through the transcription endpoint
//!
//! Recorded audio is uploaded as `multipart/form-data` with a single `file`
//! part. The endpoint answers `{"transcript": "..."}` on success or
//! `{"error": ...}` on failure.

use crate::session::envelope::extract_error_detail;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Encoded audio ready for upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioUpload {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,

    /// File name reported in the multipart part
    pub file_name: String,

    /// MIME type of `bytes`
    pub mime_type: String,
}

impl AudioUpload {
    /// Wrap an in-memory WAV recording
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "recording.wav".to_string(),
            mime_type: "audio/wav".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Collaborator that turns recorded audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String>;
}

/// Transcriber backed by the HTTP transcription endpoint
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String> {
        debug!(
            "Uploading {} bytes of {} for transcription",
            audio.bytes.len(),
            audio.mime_type
        );

        let part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)
            .map_err(|e| BridgeError::Transcription(format!("Invalid audio MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BridgeError::Transcription(format!("Upload failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Transcription(format!("Failed to read response: {}", e)))?;
        let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        if !status.is_success() || payload.get("error").is_some() {
            let fallback = status.canonical_reason().unwrap_or("transcription failed");
            return Err(BridgeError::Transcription(extract_error_detail(
                &payload, fallback,
            )));
        }

        payload
            .get("transcript")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Transcription("Response carried no transcript".to_string()))
    }
}
