//! Speech collaborators for STT and TTS
//!
//! This module provides:
//! - Speech-to-text (STT) through the transcription endpoint
//! - Text-to-speech (TTS) through the speech-synthesis endpoint

pub mod stt;
pub mod tts;

// Re-export commonly used types
pub use stt::{AudioUpload, HttpTranscriber, Transcriber};
pub use tts::{
    prepare_spoken_text, strip_classification_prefix, HttpSynthesizer, SpeechClip,
    SpeechSynthesizer,
};
