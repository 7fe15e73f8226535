//! Session orchestrator for the embedded chat widget
//!
//! Composes the readiness gate, session provider, fact registry, voice
//! capture and playback around one mounted widget instance, and reduces their
//! state to a single `SurfaceView` for the host.

use crate::audio::{
    select_capture, AudioSink, CaptureBackends, CaptureControl, CaptureState, Microphone,
    PlaybackController, SpeechRecognizer, VoiceCapture,
};
use crate::facts::{FactAction, FactRegistry};
use crate::integration::config::BridgeConfig;
use crate::session::{HttpSessionBackend, SessionBackend, SessionProvider};
use crate::speech::{HttpSynthesizer, HttpTranscriber, SpeechSynthesizer, Transcriber};
use crate::state::{ErrorChannel, ErrorSlot, GenerationCounter, SurfaceView, WidgetInstanceKey};
use crate::widget::{
    AssistantMessage, ChatWidget, ClientToolCall, ReadinessGate, ReadinessState, ScriptSignal,
    Signal, ToolResult,
};
use crate::{BridgeError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Client tool that asks the host to switch color scheme
pub const SWITCH_THEME_TOOL: &str = "switch_theme";

/// Client tool that records a durable fact
pub const RECORD_FACT_TOOL: &str = "record_fact";

const EVENT_CAPACITY: usize = 100;

/// Color scheme the assistant may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    Dark,
}

impl ColorScheme {
    /// Parse one of the two known scheme names
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ColorScheme::Light),
            "dark" => Some(ColorScheme::Dark),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorScheme::Light => write!(f, "light"),
            ColorScheme::Dark => write!(f, "dark"),
        }
    }
}

/// Events delivered to the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A newly recorded fact should be persisted
    FactSaved(FactAction),

    /// The assistant finished a response
    ResponseCompleted,

    /// The assistant asked for a different color scheme
    ThemeRequested(ColorScheme),
}

/// Receiving end of the host event channel
pub struct BridgeEvents {
    event_rx: Receiver<BridgeEvent>,
}

impl BridgeEvents {
    /// Try to receive an event without blocking
    pub fn try_recv_event(&self) -> Option<BridgeEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until an event arrives, or `None` once the orchestrator is gone
    pub fn recv_event(&self) -> Option<BridgeEvent> {
        self.event_rx.recv().ok()
    }

    /// Block for at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<BridgeEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// All events currently queued
    pub fn drain(&self) -> Vec<BridgeEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Get the raw receiver for use with `crossbeam_channel::select!`
    pub fn receiver(&self) -> Receiver<BridgeEvent> {
        self.event_rx.clone()
    }
}

fn emit(event_tx: &Sender<BridgeEvent>, event: BridgeEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => warn!("Host event queue full, dropping {:?}", event),
        Err(TrySendError::Disconnected(_)) => debug!("Host event receiver dropped"),
    }
}

/// Orchestrates one embedded widget and its collaborators
pub struct SessionOrchestrator {
    config: BridgeConfig,
    errors: ErrorChannel,
    initializing: Arc<AtomicBool>,
    mount: GenerationCounter,
    instance_key: Mutex<WidgetInstanceKey>,
    readiness: ReadinessGate,
    provider: SessionProvider,
    facts: FactRegistry,
    capture: Arc<dyn VoiceCapture>,
    playback: Option<Arc<PlaybackController>>,
    responses: Signal<AssistantMessage>,
    response_listener: Mutex<Option<JoinHandle<()>>>,
    runtime: Mutex<Option<Handle>>,
    event_tx: Sender<BridgeEvent>,
}

impl SessionOrchestrator {
    /// Activate the readiness gate and start listening for responses
    ///
    /// Must be called from within a tokio runtime. The runtime is remembered
    /// so later calls such as `reset` work from any thread.
    pub fn mount(&self) {
        info!("Mounting widget {}", self.instance_key());
        *self.runtime.lock() = Some(Handle::current());
        self.readiness.activate();
        self.listen_for_responses();
    }

    /// Tear down listeners and drop in-flight work
    pub fn unmount(&self) {
        info!("Unmounting widget {}", self.instance_key());
        self.mount.advance();
        self.readiness.deactivate();
        if let Some(listener) = self.response_listener.lock().take() {
            listener.abort();
        }
        self.stop_playback();
        self.capture.abandon();
    }

    /// Start over with a fresh widget instance
    ///
    /// Re-arming the readiness gate spawns onto the runtime captured by
    /// `mount`; before the first mount this must run inside a tokio runtime.
    pub fn reset(&self) {
        let runtime = self.runtime.lock().clone();
        let _entered = runtime.as_ref().map(Handle::enter);

        self.facts.clear();
        self.stop_playback();
        self.capture.abandon();
        self.mount.advance();
        self.readiness.activate();
        self.initializing.store(true, Ordering::SeqCst);
        self.errors.reset();

        let key = {
            let mut key = self.instance_key.lock();
            *key = key.next();
            *key
        };
        info!("Reset complete, remounting as {}", key);
    }

    /// The surface the host should present
    pub fn view(&self) -> SurfaceView {
        SurfaceView::resolve(&self.errors.snapshot(), self.is_initializing())
    }

    /// Credential resolver handed to the widget
    pub async fn acquire_secret(&self, current: Option<&SecretString>) -> Result<SecretString> {
        self.provider.acquire(current).await
    }

    pub fn on_response_start(&self) {
        self.stop_playback();
        self.errors.set_error(ErrorSlot::Integration, None);
    }

    pub fn on_response_end(&self) {
        emit(&self.event_tx, BridgeEvent::ResponseCompleted);
    }

    pub fn on_thread_change(&self) {
        debug!("Thread changed, clearing recorded facts");
        self.facts.clear();
    }

    pub fn on_error(&self, detail: &str) {
        error!("Widget error: {}", detail);
    }

    /// Handle a client tool invocation from the widget
    pub fn on_client_tool(&self, call: &ClientToolCall) -> ToolResult {
        match call.name.as_str() {
            SWITCH_THEME_TOOL => {
                let requested = call.param_str("theme");
                match ColorScheme::parse(&requested) {
                    Some(scheme) => {
                        debug!("Theme change requested: {}", scheme);
                        emit(&self.event_tx, BridgeEvent::ThemeRequested(scheme));
                        ToolResult::ok()
                    }
                    None => {
                        warn!("Rejected unknown theme {:?}", requested);
                        ToolResult::failed()
                    }
                }
            }
            RECORD_FACT_TOOL => {
                let outcome = self
                    .facts
                    .dispatch(&call.param_str("fact_id"), &call.param_str("fact_text"));
                debug!("record_fact: {:?}", outcome);
                // Duplicates still succeed so the widget shows no tool failure
                ToolResult::ok()
            }
            other => {
                warn!("Unknown client tool: {}", other);
                ToolResult::failed()
            }
        }
    }

    /// Press the voice control: start, or stop and transcribe
    pub async fn toggle_voice(&self) -> Result<()> {
        let result = match self.capture.state() {
            CaptureState::Idle => self.capture.start().await,
            CaptureState::Recording => self.capture.stop().await,
            CaptureState::Processing => {
                debug!("Voice control pressed while processing");
                Ok(())
            }
        };

        if let Err(e) = &result {
            warn!("Voice capture: {}", e);
        }
        result
    }

    pub fn voice_control(&self) -> CaptureControl {
        self.capture.control()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn is_speaking(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_speaking())
    }

    pub fn instance_key(&self) -> WidgetInstanceKey {
        *self.instance_key.lock()
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }

    pub fn readiness(&self) -> ReadinessState {
        self.readiness.state()
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn facts(&self) -> &FactRegistry {
        &self.facts
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Hub the host emits widget "response" events on
    pub fn response_signal(&self) -> Signal<AssistantMessage> {
        self.responses.clone()
    }

    fn stop_playback(&self) {
        if let Some(playback) = &self.playback {
            playback.stop();
        }
    }

    fn listen_for_responses(&self) {
        let mut listener = self.response_listener.lock();
        if let Some(previous) = listener.take() {
            previous.abort();
        }

        let Some(playback) = self.playback.clone() else {
            return;
        };
        if !self.config.voice.speak_responses {
            return;
        }

        let mut subscription = self.responses.subscribe();

        *listener = Some(tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                if !message.is_assistant() {
                    continue;
                }

                // Claim the slot before spawning so replies preempt in arrival order
                let Some(utterance) = playback.begin(&message.text()) else {
                    continue;
                };
                let playback = Arc::clone(&playback);
                tokio::spawn(async move {
                    if let Err(e) = playback.finish(utterance).await {
                        warn!("Spoken reply failed: {}", e);
                    }
                });
            }
        }));
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        if let Some(listener) = self.response_listener.lock().take() {
            listener.abort();
        }
    }
}

/// Builder for creating an orchestrator
pub struct OrchestratorBuilder {
    config: BridgeConfig,
    widget: Option<Arc<dyn ChatWidget>>,
    session_backend: Option<Arc<dyn SessionBackend>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    audio_sink: Option<Arc<dyn AudioSink>>,
    microphone: Option<Arc<dyn Microphone>>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    script_signals: Signal<ScriptSignal>,
    responses: Signal<AssistantMessage>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            widget: None,
            session_backend: None,
            transcriber: None,
            synthesizer: None,
            audio_sink: None,
            microphone: None,
            recognizer: None,
            script_signals: Signal::new(),
            responses: Signal::new(),
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the widget instance (required)
    pub fn with_widget(mut self, widget: Arc<dyn ChatWidget>) -> Self {
        self.widget = Some(widget);
        self
    }

    /// Replace the HTTP session backend
    pub fn with_session_backend(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.session_backend = Some(backend);
        self
    }

    /// Replace the HTTP transcriber
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Replace the HTTP speech synthesizer
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Enable spoken replies through `sink`
    pub fn with_audio_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.audio_sink = Some(sink);
        self
    }

    /// Enable server-transcription capture from `microphone`
    pub fn with_microphone(mut self, microphone: Arc<dyn Microphone>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    /// Enable on-device recognition through `recognizer`
    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Hub the host emits script load signals on
    pub fn with_script_signals(mut self, signals: Signal<ScriptSignal>) -> Self {
        self.script_signals = signals;
        self
    }

    /// Hub the host emits widget "response" events on
    pub fn with_response_signal(mut self, responses: Signal<AssistantMessage>) -> Self {
        self.responses = responses;
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<(SessionOrchestrator, BridgeEvents)> {
        let config = self.config;
        config.validate()?;

        let widget = self
            .widget
            .ok_or_else(|| BridgeError::Configuration("A chat widget is required".to_string()))?;

        let session_backend: Arc<dyn SessionBackend> = match self.session_backend {
            Some(backend) => backend,
            None => Arc::new(HttpSessionBackend::new(
                config.session_endpoint.clone(),
                config.request_timeout(),
            )?),
        };

        let transcriber: Option<Arc<dyn Transcriber>> = match (self.transcriber, &self.microphone)
        {
            (Some(transcriber), _) => Some(transcriber),
            (None, Some(_)) => Some(Arc::new(HttpTranscriber::new(
                config.transcription_endpoint.clone(),
                config.request_timeout(),
            )?)),
            (None, None) => None,
        };

        let playback = match self.audio_sink {
            Some(sink) => {
                let synthesizer: Arc<dyn SpeechSynthesizer> = match self.synthesizer {
                    Some(synthesizer) => synthesizer,
                    None => Arc::new(HttpSynthesizer::new(
                        config.speech_endpoint.clone(),
                        config.request_timeout(),
                    )?),
                };
                Some(Arc::new(PlaybackController::new(synthesizer, sink)))
            }
            None => None,
        };

        let capture = select_capture(
            config.voice.strategy,
            CaptureBackends {
                microphone: self.microphone,
                transcriber,
                recognizer: self.recognizer,
                max_recording_secs: config.voice.max_recording_secs,
            },
            Arc::clone(&widget),
        );

        let errors = ErrorChannel::new();
        let initializing = Arc::new(AtomicBool::new(true));
        let mount = GenerationCounter::new();

        let readiness = ReadinessGate::new(
            Arc::clone(&widget),
            self.script_signals,
            errors.clone(),
            config.readiness_timeout(),
        );

        let provider = SessionProvider::new(
            config.session_settings(),
            session_backend,
            errors.clone(),
            Arc::clone(&initializing),
            mount.clone(),
        );

        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let fact_tx = event_tx.clone();
        let facts = FactRegistry::new(move |action| emit(&fact_tx, BridgeEvent::FactSaved(action)));

        let orchestrator = SessionOrchestrator {
            config,
            errors,
            initializing,
            mount,
            instance_key: Mutex::new(WidgetInstanceKey::default()),
            readiness,
            provider,
            facts,
            capture,
            playback,
            responses: self.responses,
            response_listener: Mutex::new(None),
            runtime: Mutex::new(None),
            event_tx,
        };

        Ok((orchestrator, BridgeEvents { event_rx }))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
