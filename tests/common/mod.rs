//! Fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chatbridge::audio::{
    AudioFormat, AudioSink, MicStream, Microphone, PlaybackHandle, RecognitionEvent,
    SpeechRecognizer,
};
use chatbridge::session::{SessionBackend, SessionRequest, SessionResponse};
use chatbridge::speech::{AudioUpload, SpeechClip, SpeechSynthesizer, Transcriber};
use chatbridge::widget::ChatWidget;
use chatbridge::{BridgeError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

#[derive(Default)]
pub struct FakeWidget {
    pub registered: AtomicBool,
    pub sent: Mutex<Vec<String>>,
}

impl FakeWidget {
    pub fn registered() -> Arc<Self> {
        let widget = Self::default();
        widget.registered.store(true, Ordering::SeqCst);
        Arc::new(widget)
    }

    pub fn unregistered() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ChatWidget for FakeWidget {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }
}

/// Session backend replaying canned responses in order
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<SessionResponse>>>,
    pub requests: Mutex<Vec<SessionRequest>>,
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn replying(responses: Vec<Result<SessionResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Backend that holds each response until the gate is notified
    pub fn gated(responses: Vec<Result<SessionResponse>>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl SessionBackend for ScriptedBackend {
    async fn create_session(&self, request: &SessionRequest) -> Result<SessionResponse> {
        self.requests.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::Session("no scripted response".into())))
    }
}

#[derive(Default)]
pub struct FakeMicrophone {
    senders: Mutex<Vec<mpsc::UnboundedSender<Vec<f32>>>>,
    releases: Arc<AtomicUsize>,
}

impl FakeMicrophone {
    pub fn feed(&self, chunk: Vec<f32>) {
        if let Some(tx) = self.senders.lock().last() {
            let _ = tx.send(chunk);
        }
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for FakeMicrophone {
    async fn open(&self) -> Result<MicStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        let releases = Arc::clone(&self.releases);
        Ok(MicStream::new(AudioFormat::mono(16000), rx, move || {
            releases.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

pub struct FakeTranscriber {
    pub transcript: String,
    pub uploads: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new(transcript: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: transcript.to_string(),
            uploads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: AudioUpload) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

#[derive(Default)]
pub struct RecordingSynthesizer {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechClip> {
        self.spoken.lock().push(text.to_string());
        Ok(SpeechClip::new(text.as_bytes().to_vec(), "audio/mpeg"))
    }
}

pub struct FakePlayback {
    pub text: String,
    pub stopped: AtomicBool,
    done: Notify,
}

impl FakePlayback {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackHandle for FakePlayback {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.done.notify_one();
    }

    async fn finished(&self) {
        self.done.notified().await;
    }
}

#[derive(Default)]
pub struct FakeSpeaker {
    pub handles: Mutex<Vec<Arc<FakePlayback>>>,
}

impl FakeSpeaker {
    pub fn handle(&self, index: usize) -> Arc<FakePlayback> {
        Arc::clone(&self.handles.lock()[index])
    }

    pub fn played(&self) -> usize {
        self.handles.lock().len()
    }

    /// Text of every utterance that is still playing
    pub fn live(&self) -> Vec<String> {
        self.handles
            .lock()
            .iter()
            .filter(|h| !h.is_stopped())
            .map(|h| h.text.clone())
            .collect()
    }
}

#[async_trait]
impl AudioSink for FakeSpeaker {
    async fn play(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>> {
        let handle = Arc::new(FakePlayback {
            text: String::from_utf8_lossy(&clip.bytes).into_owned(),
            stopped: AtomicBool::new(false),
            done: Notify::new(),
        });
        self.handles.lock().push(Arc::clone(&handle));
        Ok(handle)
    }
}

/// Recognizer whose `start` parks until the gate is notified
#[derive(Default)]
pub struct GatedRecognizer {
    pub gate: Notify,
    stops: AtomicUsize,
}

impl GatedRecognizer {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for GatedRecognizer {
    async fn start(&self) -> Result<mpsc::UnboundedReceiver<RecognitionEvent>> {
        self.gate.notified().await;
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Let spawned tasks run until `done` holds or the budget runs out
pub async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..50 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
}
