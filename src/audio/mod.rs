//! Voice capture and spoken playback
//!
//! Device access lives behind the `Microphone` and `AudioSink` seams. The
//! cpal/rodio implementations are compiled with the `audio-io` feature.

pub mod buffer;
pub mod capture;
#[cfg(feature = "audio-io")]
pub mod input;
pub mod microphone;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod playback;
pub mod recognition;
pub mod transcribe;
pub mod wav;

pub use buffer::ChunkBuffer;
pub use capture::{
    select_capture, CaptureBackends, CaptureControl, CaptureState, UnsupportedCapture,
    VoiceCapture, VoiceStrategy,
};
#[cfg(feature = "audio-io")]
pub use input::CpalMicrophone;
pub use microphone::{MicStream, Microphone};
#[cfg(feature = "audio-io")]
pub use output::RodioSpeaker;
pub use playback::{
    AudioSink, PendingUtterance, PlaybackController, PlaybackHandle, SpeakOutcome,
};
pub use recognition::{OnDeviceCapture, RecognitionEvent, SpeechRecognizer};
pub use transcribe::ServerTranscriptionCapture;
pub use wav::{encode_wav, AudioFormat};
