//! On-device speech recognition capture
//!
//! Wraps a platform recognizer when one exists. Without a recognizer the
//! capture reports itself unsupported and the trigger control is disabled.

use super::capture::{CaptureState, VoiceCapture};
use crate::state::{Generation, GenerationCounter};
use crate::widget::ChatWidget;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Event emitted by a running recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Result(String),
    Error(String),
    End,
}

/// Platform speech recognizer
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin recognition, returning the event stream for this session
    async fn start(&self) -> Result<mpsc::UnboundedReceiver<RecognitionEvent>>;

    /// Ask the recognizer to finish; it answers with a final result or `End`
    fn stop(&self);
}

#[derive(Default)]
struct RecognitionInner {
    state: CaptureState,
    listener: Option<JoinHandle<()>>,
}

pub struct OnDeviceCapture {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    widget: Arc<dyn ChatWidget>,
    inner: Arc<Mutex<RecognitionInner>>,
    generation: GenerationCounter,
}

impl OnDeviceCapture {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        widget: Arc<dyn ChatWidget>,
    ) -> Self {
        Self {
            recognizer,
            widget,
            inner: Arc::new(Mutex::new(RecognitionInner::default())),
            generation: GenerationCounter::new(),
        }
    }

    fn finish(
        inner: &Mutex<RecognitionInner>,
        generation: &GenerationCounter,
        token: Generation,
    ) -> bool {
        let mut inner = inner.lock();
        if !generation.is_current(token) {
            return false;
        }
        inner.state = CaptureState::Idle;
        inner.listener = None;
        true
    }
}

#[async_trait]
impl VoiceCapture for OnDeviceCapture {
    fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    async fn start(&self) -> Result<()> {
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or(BridgeError::VoiceUnavailable)?;

        let token = {
            let mut inner = self.inner.lock();
            if !inner.state.is_idle() {
                return Err(BridgeError::CaptureBusy);
            }
            inner.state = CaptureState::Recording;
            self.generation.current()
        };

        let mut events = match recognizer.start().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Speech recognition failed to start: {}", e);
                Self::finish(&self.inner, &self.generation, token);
                return Err(e);
            }
        };

        let mut guard = self.inner.lock();
        if !self.generation.is_current(token) {
            drop(guard);
            recognizer.stop();
            debug!("Speech recognition abandoned while starting");
            return Err(BridgeError::Superseded);
        }

        let inner = Arc::clone(&self.inner);
        let generation = self.generation.clone();
        let widget = Arc::clone(&self.widget);

        let listener = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !generation.is_current(token) {
                    return;
                }

                match event {
                    RecognitionEvent::Result(transcript) => {
                        let transcript = transcript.trim();
                        if !transcript.is_empty() {
                            if let Err(e) = widget.send_message(transcript).await {
                                warn!("Failed to send transcript to widget: {}", e);
                            }
                        }
                        break;
                    }
                    RecognitionEvent::Error(e) => {
                        warn!("Speech recognition error: {}", e);
                        break;
                    }
                    RecognitionEvent::End => {
                        debug!("Speech recognition ended");
                        break;
                    }
                }
            }
            OnDeviceCapture::finish(&inner, &generation, token);
        });

        guard.listener = Some(listener);
        info!("Started speech recognition");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let Some(recognizer) = &self.recognizer else {
            return Ok(());
        };

        {
            let mut inner = self.inner.lock();
            if !inner.state.is_recording() {
                return Ok(());
            }
            inner.state = CaptureState::Processing;
        }

        recognizer.stop();
        Ok(())
    }

    fn abandon(&self) {
        let mut inner = self.inner.lock();
        self.generation.advance();
        if let Some(listener) = inner.listener.take() {
            listener.abort();
            if let Some(recognizer) = &self.recognizer {
                recognizer.stop();
            }
            info!("Abandoned speech recognition");
        }
        inner.state = CaptureState::Idle;
    }
}
