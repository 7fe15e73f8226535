use super::microphone::{MicStream, Microphone};
use super::wav::AudioFormat;
use crate::{BridgeError, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

/// Microphone backed by the default cpal input device
///
/// cpal streams are not `Send`, so each opened stream lives on its own
/// thread until the returned [`MicStream`] is released.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }

    /// Check whether the host exposes an input device at all
    pub fn is_available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }
}

fn run_input_stream(
    chunk_tx: mpsc::UnboundedSender<Vec<f32>>,
    ready_tx: oneshot::Sender<Result<AudioFormat>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        let _ = ready_tx.send(Err(BridgeError::AudioDevice(
            "No input device available".into(),
        )));
        return;
    };

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let config: cpal::StreamConfig = match device.default_input_config() {
        Ok(config) => config.into(),
        Err(e) => {
            let _ = ready_tx.send(Err(BridgeError::AudioDevice(format!(
                "Failed to get input config: {}",
                e
            ))));
            return;
        }
    };

    let channels = config.channels as usize;
    let format = AudioFormat::mono(config.sample_rate.0);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Downmix to mono
            let samples = if channels == 1 {
                data.to_vec()
            } else {
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                    .collect()
            };

            if chunk_tx.send(samples).is_err() {
                debug!("Capture receiver dropped");
            }
        },
        |err| error!("Audio input stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(BridgeError::AudioDevice(format!(
                "Failed to build input stream: {}",
                e
            ))));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(BridgeError::AudioDevice(format!(
            "Failed to start input stream: {}",
            e
        ))));
        return;
    }

    if ready_tx.send(Ok(format)).is_err() {
        return;
    }

    // Blocks until the MicStream is released or dropped
    let _ = stop_rx.recv();
    drop(stream);
    info!("Stopped audio recording");
}

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn open(&self) -> Result<MicStream> {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("chatbridge-mic".into())
            .spawn(move || run_input_stream(chunk_tx, ready_tx, stop_rx))
            .map_err(|e| BridgeError::AudioDevice(format!("Failed to spawn capture thread: {}", e)))?;

        let format = ready_rx
            .await
            .map_err(|_| BridgeError::AudioDevice("Capture thread exited early".into()))??;

        info!("Started audio recording at {} Hz", format.sample_rate);
        Ok(MicStream::new(format, chunk_rx, move || {
            let _ = stop_tx.send(());
        }))
    }
}
