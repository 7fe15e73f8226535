use super::wav::AudioFormat;
use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// An open microphone stream delivering mono f32 chunks
///
/// The underlying device is released when the stream is dropped.
pub struct MicStream {
    format: AudioFormat,
    chunks: mpsc::UnboundedReceiver<Vec<f32>>,
    release: Option<ReleaseFn>,
}

impl MicStream {
    pub fn new(
        format: AudioFormat,
        chunks: mpsc::UnboundedReceiver<Vec<f32>>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            format,
            chunks,
            release: Some(Box::new(release)),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Next captured chunk, or `None` once the device stops delivering
    pub async fn next_chunk(&mut self) -> Option<Vec<f32>> {
        self.chunks.recv().await
    }

    /// A chunk that is already waiting, without suspending
    pub fn try_next_chunk(&mut self) -> Option<Vec<f32>> {
        self.chunks.try_recv().ok()
    }

    /// Release the device now
    pub fn release(mut self) {
        self.release_device();
    }

    fn release_device(&mut self) {
        if let Some(release) = self.release.take() {
            debug!("Releasing microphone stream");
            release();
        }
    }
}

impl Drop for MicStream {
    fn drop(&mut self) {
        self.release_device();
    }
}

/// Source of microphone streams
#[async_trait]
pub trait Microphone: Send + Sync {
    async fn open(&self) -> Result<MicStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_release_runs_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&releases);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = MicStream::new(AudioFormat::mono(16000), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tx.send(vec![0.5; 4]).unwrap();
        assert_eq!(stream.next_chunk().await, Some(vec![0.5; 4]));

        stream.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_device() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&releases);
        let (_tx, rx) = mpsc::unbounded_channel();
        let stream = MicStream::new(AudioFormat::default(), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(stream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
