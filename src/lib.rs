//! Session orchestration for an embedded chat widget
//!
//! Procures session credentials, watches the widget runtime load, reduces
//! failures to one blocking error, forwards recorded facts to the host and
//! adds voice input and spoken replies around the widget.

pub mod audio;
pub mod facts;
pub mod integration;
pub mod session;
pub mod speech;
pub mod state;
pub mod widget;

pub use integration::{
    BridgeConfig, BridgeEvent, BridgeEvents, OrchestratorBuilder, SessionOrchestrator,
};
pub use state::{ErrorChannel, ErrorSlot, ErrorState, SurfaceView};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error("{0}")]
    Script(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Session(String),

    #[error("{0}")]
    Integration(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Voice capture is not available on this platform")]
    VoiceUnavailable,

    #[error("A voice capture is already in progress")]
    CaptureBusy,

    #[error("IO error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Operation superseded by a reset")]
    Superseded,
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Io(e.to_string())
    }
}

impl BridgeError {
    /// The error slot this failure is reported through, if it blocks the widget.
    ///
    /// Voice and playback failures degrade silently and have no slot.
    pub fn slot(&self) -> Option<ErrorSlot> {
        match self {
            BridgeError::Script(_) => Some(ErrorSlot::Script),
            BridgeError::Configuration(_) | BridgeError::Session(_) => Some(ErrorSlot::Session),
            BridgeError::Integration(_) => Some(ErrorSlot::Integration),
            _ => None,
        }
    }

    /// Check if this error is recoverable without an explicit reset
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Blocking errors stay on screen until the user resets
            BridgeError::Script(_) => false,
            BridgeError::Configuration(_) => false,
            BridgeError::Session(_) => false,
            // Cleared automatically when the next response starts
            BridgeError::Integration(_) => true,
            // Voice features degrade and the widget stays usable
            BridgeError::Transcription(_) => true,
            BridgeError::Synthesis(_) => true,
            BridgeError::AudioDevice(_) => true,
            BridgeError::VoiceUnavailable => true,
            BridgeError::CaptureBusy => true,
            BridgeError::Io(_) => false,
            BridgeError::Http(_) => true,
            BridgeError::Superseded => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_errors_map_to_slots() {
        assert_eq!(
            BridgeError::Script("x".into()).slot(),
            Some(ErrorSlot::Script)
        );
        assert_eq!(
            BridgeError::Configuration("x".into()).slot(),
            Some(ErrorSlot::Session)
        );
        assert_eq!(
            BridgeError::Session("x".into()).slot(),
            Some(ErrorSlot::Session)
        );
        assert_eq!(BridgeError::Transcription("x".into()).slot(), None);
        assert_eq!(BridgeError::VoiceUnavailable.slot(), None);
    }

    #[test]
    fn test_session_error_displays_detail_verbatim() {
        let err = BridgeError::Session("bad workflow".into());
        assert_eq!(err.to_string(), "bad workflow");
        assert!(!err.is_recoverable());
    }
}
