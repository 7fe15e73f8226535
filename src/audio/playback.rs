//! Spoken replies
//!
//! The controller owns at most one live playback handle. Every `speak` call
//! preempts whatever is playing, and a natural end of playback clears the
//! handle so the next utterance starts from a clean slate.

use crate::speech::{prepare_spoken_text, SpeechClip, SpeechSynthesizer};
use crate::state::{Generation, GenerationCounter};
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// A single utterance being played
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Stop immediately; `finished` resolves afterwards
    fn stop(&self);

    /// Resolves once playback ended, naturally or through `stop`
    async fn finished(&self);
}

/// Output device for synthesized speech
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>>;
}

/// Result of a `speak` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Playback started
    Started,
    /// Nothing left to say after stripping metadata
    Empty,
    /// Preempted by a later `speak` or `stop` before playback began
    Superseded,
}

/// Utterance that has claimed the playback slot but is not yet audible
#[derive(Debug)]
pub struct PendingUtterance {
    generation: Generation,
    text: String,
}

impl PendingUtterance {
    pub fn text(&self) -> &str {
        &self.text
    }
}

struct ActivePlayback {
    generation: Generation,
    handle: Arc<dyn PlaybackHandle>,
}

pub struct PlaybackController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    active: Arc<Mutex<Option<ActivePlayback>>>,
    generation: GenerationCounter,
}

impl PlaybackController {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            synthesizer,
            sink,
            active: Arc::new(Mutex::new(None)),
            generation: GenerationCounter::new(),
        }
    }

    /// Speak `text`, stopping any utterance already playing
    ///
    /// Synthesis and device failures are returned to the caller, who is
    /// expected to log them; they never affect the blocking error channel.
    pub async fn speak(&self, text: &str) -> Result<SpeakOutcome> {
        match self.begin(text) {
            Some(utterance) => self.finish(utterance).await,
            None => Ok(SpeakOutcome::Empty),
        }
    }

    /// Preempt the current utterance and claim the next playback slot
    ///
    /// Returns `None` when nothing is left to say, in which case the current
    /// utterance keeps playing.
    pub fn begin(&self, text: &str) -> Option<PendingUtterance> {
        let Some(spoken) = prepare_spoken_text(text) else {
            debug!("Nothing to speak after removing metadata");
            return None;
        };

        let generation = {
            let mut active = self.active.lock();
            let generation = self.generation.advance();
            if let Some(playback) = active.take() {
                debug!("Stopping active playback");
                playback.handle.stop();
            }
            generation
        };

        Some(PendingUtterance {
            generation,
            text: spoken.to_string(),
        })
    }

    /// Synthesize and play a claimed utterance unless it was preempted
    pub async fn finish(&self, utterance: PendingUtterance) -> Result<SpeakOutcome> {
        let PendingUtterance { generation, text } = utterance;
        if !self.generation.is_current(generation) {
            return Ok(SpeakOutcome::Superseded);
        }

        let clip = self.synthesizer.synthesize(&text).await?;
        if !self.generation.is_current(generation) {
            return Ok(SpeakOutcome::Superseded);
        }

        let handle = self.sink.play(clip).await?;

        {
            let mut active = self.active.lock();
            if !self.generation.is_current(generation) {
                drop(active);
                handle.stop();
                return Ok(SpeakOutcome::Superseded);
            }
            *active = Some(ActivePlayback {
                generation,
                handle: Arc::clone(&handle),
            });
        }

        let slot = Arc::clone(&self.active);
        tokio::spawn(async move {
            handle.finished().await;
            let mut active = slot.lock();
            if active.as_ref().map(|a| a.generation) == Some(generation) {
                debug!("Playback finished");
                *active = None;
            }
        });

        info!("Speaking {} chars", text.len());
        Ok(SpeakOutcome::Started)
    }

    /// Stop the active utterance, if any
    pub fn stop(&self) {
        let mut active = self.active.lock();
        self.generation.advance();
        if let Some(playback) = active.take() {
            debug!("Stopping active playback");
            playback.handle.stop();
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}
