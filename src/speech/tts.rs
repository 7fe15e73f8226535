//! Text-to-speech through the speech-synthesis endpoint
//!
//! This module provides:
//! - preparation of assistant text for speaking (classification header removal)
//! - the `SpeechSynthesizer` seam and its HTTP implementation

use crate::session::envelope::extract_error_detail;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Synthesized audio returned by the speech endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechClip {
    /// Encoded audio (usually MP3)
    pub bytes: Vec<u8>,

    /// MIME type reported by the endpoint
    pub mime_type: String,
}

impl SpeechClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Collaborator that turns text into audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SpeechClip>;
}

/// Remove a leading JSON object (e.g. a classification header) from `text`
///
/// Returns `text` unchanged when it does not start with a complete object.
pub fn strip_classification_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return text;
    }

    let mut values = serde_json::Deserializer::from_str(trimmed).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Object(_))) => &trimmed[values.byte_offset()..],
        _ => text,
    }
}

/// Text that should actually be spoken, or `None` if nothing remains
pub fn prepare_spoken_text(text: &str) -> Option<&str> {
    let spoken = strip_classification_prefix(text).trim();
    (!spoken.is_empty()).then_some(spoken)
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
}

/// Synthesizer backed by the HTTP speech endpoint
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSynthesizer {
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
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechClip> {
        debug!("Synthesizing {} chars", text.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&SpeechRequest { text })
            .send()
            .await
            .map_err(|e| BridgeError::Synthesis(format!("Request failed: {}", e)))?;

        let status = response.status();
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Synthesis(format!("Failed to read audio: {}", e)))?;

        if status.is_success() && mime_type.starts_with("audio/") {
            return Ok(SpeechClip::new(bytes.to_vec(), mime_type));
        }

        let payload: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        let fallback = status.canonical_reason().unwrap_or("speech synthesis failed");
        Err(BridgeError::Synthesis(extract_error_detail(&payload, fallback)))
    }
}
