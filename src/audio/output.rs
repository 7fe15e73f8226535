use super::playback::{AudioSink, PlaybackHandle};
use crate::speech::SpeechClip;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Speaker backed by the default rodio output device
///
/// The output stream is not `Send`; it is kept alive on a parked thread for
/// as long as the speaker exists.
pub struct RodioSpeaker {
    handle: OutputStreamHandle,
    _shutdown: std_mpsc::Sender<()>,
}

impl RodioSpeaker {
    pub fn new() -> Result<Self> {
        let (handle_tx, handle_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("chatbridge-speaker".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if handle_tx.send(Ok(handle)).is_ok() {
                        // Returns once the speaker is dropped
                        let _ = shutdown_rx.recv();
                    }
                    drop(stream);
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(BridgeError::AudioDevice(format!(
                        "No output device available: {}",
                        e
                    ))));
                }
            })
            .map_err(|e| BridgeError::AudioDevice(format!("Failed to spawn output thread: {}", e)))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| BridgeError::AudioDevice("Output thread exited early".into()))??;

        info!("Audio output ready");
        Ok(Self {
            handle,
            _shutdown: shutdown_tx,
        })
    }
}

struct RodioPlayback {
    sink: Sink,
    stopped: AtomicBool,
}

#[async_trait]
impl PlaybackHandle for RodioPlayback {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.sink.stop();
    }

    async fn finished(&self) {
        while !self.stopped.load(Ordering::SeqCst) && !self.sink.empty() {
            tokio::time::sleep(FINISH_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl AudioSink for RodioSpeaker {
    async fn play(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>> {
        debug!("Playing {} bytes of {}", clip.len(), clip.mime_type);

        let source = Decoder::new(Cursor::new(clip.bytes))
            .map_err(|e| BridgeError::AudioDevice(format!("Failed to decode speech: {}", e)))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| BridgeError::AudioDevice(format!("Failed to open sink: {}", e)))?;
        sink.append(source);

        Ok(Arc::new(RodioPlayback {
            sink,
            stopped: AtomicBool::new(false),
        }))
    }
}
