//! Configuration for the integration layer
//!
//! Loaded from TOML, then overridden by `CHATBRIDGE_*` environment variables.
//! An unset workflow is not a validation failure: it surfaces at runtime as
//! a blocking configuration error in the session slot.

use crate::audio::VoiceStrategy;
use crate::session::SessionSettings;
use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const ENV_WORKFLOW_ID: &str = "CHATBRIDGE_WORKFLOW_ID";
pub const ENV_SESSION_ENDPOINT: &str = "CHATBRIDGE_SESSION_ENDPOINT";
pub const ENV_TRANSCRIPTION_ENDPOINT: &str = "CHATBRIDGE_TRANSCRIPTION_ENDPOINT";
pub const ENV_SPEECH_ENDPOINT: &str = "CHATBRIDGE_SPEECH_ENDPOINT";

/// Voice input and spoken reply settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Which capture strategy to compose
    pub strategy: VoiceStrategy,

    /// Upper bound on a single recording
    pub max_recording_secs: u32,

    /// Speak assistant replies aloud
    pub speak_responses: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            strategy: VoiceStrategy::Auto,
            max_recording_secs: 120,
            speak_responses: true,
        }
    }
}

/// Configuration for the complete integration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Workflow the session is created for
    pub workflow_id: Option<String>,

    /// Session-creation endpoint
    pub session_endpoint: String,

    /// Transcription endpoint (multipart upload)
    pub transcription_endpoint: String,

    /// Speech-synthesis endpoint
    pub speech_endpoint: String,

    /// Whether the widget may upload attachments
    pub attachments_enabled: bool,

    /// How long to wait for the widget runtime to register
    pub readiness_timeout_ms: u64,

    /// Timeout applied to every HTTP collaborator
    pub request_timeout_secs: u64,

    pub voice: VoiceConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            workflow_id: None,
            session_endpoint: "http://localhost:3000/api/create-session".to_string(),
            transcription_endpoint: "http://localhost:3000/api/transcribe".to_string(),
            speech_endpoint: "http://localhost:3000/api/tts".to_string(),
            attachments_enabled: true,
            readiness_timeout_ms: 5000,
            request_timeout_secs: 30,
            voice: VoiceConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| {
            BridgeError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override fields from `CHATBRIDGE_*` environment variables
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary variable source
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(workflow) = lookup(ENV_WORKFLOW_ID) {
            self.workflow_id = Some(workflow);
        }
        if let Some(endpoint) = lookup(ENV_SESSION_ENDPOINT) {
            self.session_endpoint = endpoint;
        }
        if let Some(endpoint) = lookup(ENV_TRANSCRIPTION_ENDPOINT) {
            self.transcription_endpoint = endpoint;
        }
        if let Some(endpoint) = lookup(ENV_SPEECH_ENDPOINT) {
            self.speech_endpoint = endpoint;
        }
        self
    }

    /// Set the workflow identifier
    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Point every HTTP collaborator at `origin`, keeping the default paths
    pub fn with_origin(mut self, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        self.session_endpoint = format!("{}/api/create-session", origin);
        self.transcription_endpoint = format!("{}/api/transcribe", origin);
        self.speech_endpoint = format!("{}/api/tts", origin);
        self
    }

    /// Disable attachment uploads in the widget
    pub fn without_attachments(mut self) -> Self {
        self.attachments_enabled = false;
        self
    }

    /// Do not speak assistant replies
    pub fn without_spoken_replies(mut self) -> Self {
        self.voice.speak_responses = false;
        self
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::new(self.workflow_id.clone(), self.attachments_enabled)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let endpoints = [
            ("session_endpoint", &self.session_endpoint),
            ("transcription_endpoint", &self.transcription_endpoint),
            ("speech_endpoint", &self.speech_endpoint),
        ];
        for (name, endpoint) in endpoints {
            if endpoint.trim().is_empty() {
                return Err(BridgeError::Configuration(format!("{} must not be empty", name)));
            }
        }

        if self.readiness_timeout_ms == 0 {
            return Err(BridgeError::Configuration(
                "readiness_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(BridgeError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.voice.max_recording_secs == 0 {
            return Err(BridgeError::Configuration(
                "voice.max_recording_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
