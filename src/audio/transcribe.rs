//! Server-transcription capture
//!
//! Records microphone audio into a [`ChunkBuffer`], encodes it as WAV on stop
//! and uploads it to the transcription endpoint. A non-empty transcript is
//! injected into the widget as a user message.

use super::buffer::ChunkBuffer;
use super::capture::{CaptureState, VoiceCapture};
use super::microphone::{MicStream, Microphone};
use super::wav::encode_wav;
use crate::speech::{AudioUpload, Transcriber};
use crate::state::{Generation, GenerationCounter};
use crate::widget::ChatWidget;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct ActiveRecording {
    stop_tx: oneshot::Sender<()>,
    pump: JoinHandle<(ChunkBuffer, MicStream)>,
}

#[derive(Default)]
struct CaptureInner {
    state: CaptureState,
    active: Option<ActiveRecording>,
}

pub struct ServerTranscriptionCapture {
    microphone: Arc<dyn Microphone>,
    transcriber: Arc<dyn Transcriber>,
    widget: Arc<dyn ChatWidget>,
    max_recording_secs: u32,
    inner: Arc<Mutex<CaptureInner>>,
    generation: GenerationCounter,
}

impl ServerTranscriptionCapture {
    pub fn new(
        microphone: Arc<dyn Microphone>,
        transcriber: Arc<dyn Transcriber>,
        widget: Arc<dyn ChatWidget>,
        max_recording_secs: u32,
    ) -> Self {
        Self {
            microphone,
            transcriber,
            widget,
            max_recording_secs,
            inner: Arc::new(Mutex::new(CaptureInner::default())),
            generation: GenerationCounter::new(),
        }
    }

    fn set_state_if_current(&self, generation: Generation, state: CaptureState) {
        let mut inner = self.inner.lock();
        if self.generation.is_current(generation) {
            inner.state = state;
        }
    }

    async fn transcribe_and_inject(
        &self,
        generation: Generation,
        samples: Vec<f32>,
        stream: MicStream,
    ) {
        let format = stream.format();
        stream.release();

        if samples.is_empty() {
            debug!("No audio captured, nothing to transcribe");
            return;
        }

        let bytes = match encode_wav(&samples, format) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode recording: {}", e);
                return;
            }
        };

        info!(
            "Transcribing {:.1}s of audio",
            samples.len() as f32 / format.sample_rate.max(1) as f32 / format.channels.max(1) as f32
        );

        let transcript = match self.transcriber.transcribe(AudioUpload::wav(bytes)).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!("Transcription failed: {}", e);
                return;
            }
        };

        if !self.generation.is_current(generation) {
            debug!("Capture abandoned while transcribing, dropping transcript");
            return;
        }

        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("Transcript was empty");
            return;
        }

        if let Err(e) = self.widget.send_message(transcript).await {
            warn!("Failed to send transcript to widget: {}", e);
        }
    }
}

#[async_trait]
impl VoiceCapture for ServerTranscriptionCapture {
    fn is_supported(&self) -> bool {
        true
    }

    fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    async fn start(&self) -> Result<()> {
        let generation = {
            let mut inner = self.inner.lock();
            if !inner.state.is_idle() {
                return Err(BridgeError::CaptureBusy);
            }
            inner.state = CaptureState::Recording;
            self.generation.current()
        };

        let mut stream = match self.microphone.open().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Microphone unavailable: {}", e);
                self.set_state_if_current(generation, CaptureState::Idle);
                return Err(e);
            }
        };

        let format = stream.format();
        let mut buffer = ChunkBuffer::for_duration(
            self.max_recording_secs,
            format.sample_rate * format.channels as u32,
        );
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let mut inner = self.inner.lock();
        if !self.generation.is_current(generation) {
            debug!("Capture cancelled while the microphone was opening");
            drop(inner);
            stream.release();
            return Err(BridgeError::Superseded);
        }

        let pump = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    chunk = stream.next_chunk() => match chunk {
                        Some(chunk) => {
                            buffer.push(chunk);
                        }
                        None => {
                            debug!("Microphone stream ended");
                            let _ = (&mut stop_rx).await;
                            break;
                        }
                    },
                }
            }
            while let Some(chunk) = stream.try_next_chunk() {
                buffer.push(chunk);
            }
            (buffer, stream)
        });

        inner.active = Some(ActiveRecording { stop_tx, pump });
        info!("Started voice recording");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let (generation, active) = {
            let mut inner = self.inner.lock();
            if !inner.state.is_recording() {
                debug!("Stop requested while {}", inner.state);
                return Ok(());
            }

            match inner.active.take() {
                Some(active) => {
                    inner.state = CaptureState::Processing;
                    (self.generation.current(), active)
                }
                None => {
                    // Microphone still opening; cancel it
                    self.generation.advance();
                    inner.state = CaptureState::Idle;
                    return Ok(());
                }
            }
        };

        let _ = active.stop_tx.send(());
        match active.pump.await {
            Ok((mut buffer, stream)) => {
                let samples = buffer.take();
                self.transcribe_and_inject(generation, samples, stream).await;
            }
            Err(e) => error!("Recording task failed: {}", e),
        }

        self.set_state_if_current(generation, CaptureState::Idle);
        Ok(())
    }

    fn abandon(&self) {
        let mut inner = self.inner.lock();
        self.generation.advance();
        if let Some(active) = inner.active.take() {
            // Dropping the task's stream releases the microphone
            active.pump.abort();
            info!("Abandoned voice recording");
        }
        inner.state = CaptureState::Idle;
    }
}

impl Drop for ServerTranscriptionCapture {
    fn drop(&mut self) {
        if let Some(active) = self.inner.lock().active.take() {
            active.pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::AudioFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{mpsc, Notify};

    #[derive(Default)]
    struct FakeMicrophone {
        senders: Mutex<Vec<mpsc::UnboundedSender<Vec<f32>>>>,
        releases: Arc<AtomicUsize>,
    }

    impl FakeMicrophone {
        fn feed(&self, chunk: Vec<f32>) {
            if let Some(tx) = self.senders.lock().last() {
                tx.send(chunk).unwrap();
            }
        }

        fn releases(&self) -> usize {
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

    struct FakeTranscriber {
        reply: Result<String>,
        calls: AtomicUsize,
        gate: Option<(Notify, Notify)>,
    }

    impl FakeTranscriber {
        fn replying(reply: Result<String>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, audio: AudioUpload) -> Result<String> {
            assert_eq!(audio.mime_type, "audio/wav");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct FakeWidget {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatWidget for FakeWidget {
        fn is_registered(&self) -> bool {
            true
        }

        async fn send_message(&self, text: &str) -> Result<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    fn capture_with(
        transcriber: Arc<FakeTranscriber>,
    ) -> (Arc<ServerTranscriptionCapture>, Arc<FakeMicrophone>, Arc<FakeWidget>) {
        let mic = Arc::new(FakeMicrophone::default());
        let widget = Arc::new(FakeWidget::default());
        let capture = Arc::new(ServerTranscriptionCapture::new(
            mic.clone(),
            transcriber,
            widget.clone(),
            120,
        ));
        (capture, mic, widget)
    }

    #[tokio::test]
    async fn test_transcript_is_sent_to_widget() {
        let transcriber = Arc::new(FakeTranscriber::replying(Ok("  hello there ".into())));
        let (capture, mic, widget) = capture_with(transcriber.clone());

        capture.start().await.unwrap();
        assert!(capture.state().is_recording());
        assert_eq!(capture.control().label, "stop");

        mic.feed(vec![0.1; 160]);
        mic.feed(vec![0.2; 160]);
        capture.stop().await.unwrap();

        assert_eq!(*widget.sent.lock(), vec!["hello there".to_string()]);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
        assert!(capture.state().is_idle());
        assert_eq!(mic.releases(), 1);
    }

    #[tokio::test]
    async fn test_transcription_failure_is_dropped() {
        let transcriber = Arc::new(FakeTranscriber::replying(Err(BridgeError::Transcription(
            "quota".into(),
        ))));
        let (capture, mic, widget) = capture_with(transcriber);

        capture.start().await.unwrap();
        mic.feed(vec![0.1; 160]);
        capture.stop().await.unwrap();

        assert!(widget.sent.lock().is_empty());
        assert!(capture.state().is_idle());
        assert_eq!(mic.releases(), 1);
    }

    #[tokio::test]
    async fn test_empty_recording_skips_upload() {
        let transcriber = Arc::new(FakeTranscriber::replying(Ok("unused".into())));
        let (capture, mic, widget) = capture_with(transcriber.clone());

        capture.start().await.unwrap();
        capture.stop().await.unwrap();

        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
        assert!(widget.sent.lock().is_empty());
        assert_eq!(mic.releases(), 1);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let transcriber = Arc::new(FakeTranscriber::replying(Ok("x".into())));
        let (capture, _mic, _widget) = capture_with(transcriber);

        capture.start().await.unwrap();
        assert!(matches!(
            capture.start().await,
            Err(BridgeError::CaptureBusy)
        ));
    }

    #[tokio::test]
    async fn test_abandon_releases_microphone() {
        let transcriber = Arc::new(FakeTranscriber::replying(Ok("x".into())));
        let (capture, mic, _widget) = capture_with(transcriber);

        capture.start().await.unwrap();
        capture.abandon();
        assert!(capture.state().is_idle());

        for _ in 0..10 {
            if mic.releases() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(mic.releases(), 1);

        // A fresh capture can start after abandonment
        capture.start().await.unwrap();
    }

    #[tokio::test]
    async fn test_abandon_during_transcription_drops_transcript() {
        let transcriber = Arc::new(FakeTranscriber {
            reply: Ok("too late".into()),
            calls: AtomicUsize::new(0),
            gate: Some((Notify::new(), Notify::new())),
        });
        let (capture, mic, widget) = capture_with(transcriber.clone());

        capture.start().await.unwrap();
        mic.feed(vec![0.3; 160]);

        let stopping = {
            let capture = Arc::clone(&capture);
            tokio::spawn(async move { capture.stop().await })
        };

        let (entered, release) = transcriber.gate.as_ref().unwrap();
        entered.notified().await;
        assert!(capture.state().is_processing());
        assert!(!capture.control().enabled);

        capture.abandon();
        release.notify_one();
        stopping.await.unwrap().unwrap();

        assert!(widget.sent.lock().is_empty());
        assert!(capture.state().is_idle());
    }
}
