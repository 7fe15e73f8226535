//! Voice capture state machine and strategy selection
//!
//! Every capture strategy moves through `idle → recording → processing → idle`
//! and exposes the same [`VoiceCapture`] seam, so the orchestrator never
//! branches on which one is in use.

use super::microphone::Microphone;
use super::recognition::{OnDeviceCapture, SpeechRecognizer};
use super::transcribe::ServerTranscriptionCapture;
use crate::speech::Transcriber;
use crate::widget::ChatWidget;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// Ready to record
    #[default]
    Idle,
    /// Microphone or recognizer is live
    Recording,
    /// Waiting for the transcript
    Processing,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, CaptureState::Recording)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, CaptureState::Processing)
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Recording => write!(f, "Recording"),
            CaptureState::Processing => write!(f, "Processing"),
        }
    }
}

/// What the voice trigger control shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureControl {
    pub label: &'static str,
    pub enabled: bool,
}

impl CaptureControl {
    pub fn for_state(state: CaptureState, supported: bool) -> Self {
        if !supported {
            return Self {
                label: "record",
                enabled: false,
            };
        }

        match state {
            CaptureState::Idle => Self {
                label: "record",
                enabled: true,
            },
            CaptureState::Recording => Self {
                label: "stop",
                enabled: true,
            },
            CaptureState::Processing => Self {
                label: "processing",
                enabled: false,
            },
        }
    }
}

/// A voice capture strategy
///
/// At most one capture session is active at a time; `start` while not idle
/// fails with [`BridgeError::CaptureBusy`].
#[async_trait]
pub trait VoiceCapture: Send + Sync {
    fn is_supported(&self) -> bool;

    fn state(&self) -> CaptureState;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Drop the current session without delivering its transcript
    fn abandon(&self);

    fn control(&self) -> CaptureControl {
        CaptureControl::for_state(self.state(), self.is_supported())
    }
}

/// Capture used when the platform offers no voice input at all
#[derive(Debug, Default)]
pub struct UnsupportedCapture;

#[async_trait]
impl VoiceCapture for UnsupportedCapture {
    fn is_supported(&self) -> bool {
        false
    }

    fn state(&self) -> CaptureState {
        CaptureState::Idle
    }

    async fn start(&self) -> Result<()> {
        Err(BridgeError::VoiceUnavailable)
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn abandon(&self) {}
}

/// Which capture strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceStrategy {
    /// Server transcription if a microphone exists, else on-device recognition
    #[default]
    Auto,
    Server,
    OnDevice,
}

/// Platform capabilities available when composing the capture strategy
#[derive(Clone, Default)]
pub struct CaptureBackends {
    pub microphone: Option<Arc<dyn Microphone>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    pub max_recording_secs: u32,
}

/// Pick the capture implementation for `strategy` given what the platform offers
pub fn select_capture(
    strategy: VoiceStrategy,
    backends: CaptureBackends,
    widget: Arc<dyn ChatWidget>,
) -> Arc<dyn VoiceCapture> {
    let server = match (&backends.microphone, &backends.transcriber) {
        (Some(mic), Some(transcriber)) => Some((Arc::clone(mic), Arc::clone(transcriber))),
        _ => None,
    };

    let capture: Arc<dyn VoiceCapture> = match (strategy, server, backends.recognizer) {
        (VoiceStrategy::Auto | VoiceStrategy::Server, Some((mic, transcriber)), _) => {
            Arc::new(ServerTranscriptionCapture::new(
                mic,
                transcriber,
                widget,
                backends.max_recording_secs,
            ))
        }
        (VoiceStrategy::Auto | VoiceStrategy::OnDevice, _, recognizer) => {
            Arc::new(OnDeviceCapture::new(recognizer, widget))
        }
        (VoiceStrategy::Server, None, _) => Arc::new(UnsupportedCapture),
    };

    info!(
        "Voice capture strategy {:?} resolved (supported: {})",
        strategy,
        capture.is_supported()
    );
    capture
}
