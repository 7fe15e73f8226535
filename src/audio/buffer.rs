use tracing::warn;

/// Accumulates captured audio chunks up to a fixed sample budget
///
/// Chunks arriving after the budget is exhausted are truncated or dropped.
#[derive(Debug)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<f32>>,
    len: usize,
    max_samples: usize,
    overflowed: bool,
}

impl ChunkBuffer {
    /// Create a buffer that holds at most `max_samples` samples
    pub fn new(max_samples: usize) -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
            max_samples,
            overflowed: false,
        }
    }

    /// Buffer sized for `seconds` of audio at `sample_rate`
    pub fn for_duration(seconds: u32, sample_rate: u32) -> Self {
        Self::new(seconds as usize * sample_rate as usize)
    }

    /// Append a chunk, returning the number of samples kept
    pub fn push(&mut self, chunk: Vec<f32>) -> usize {
        let room = self.max_samples.saturating_sub(self.len);
        if room == 0 {
            if !self.overflowed {
                warn!(
                    "Recording limit of {} samples reached, dropping further audio",
                    self.max_samples
                );
                self.overflowed = true;
            }
            return 0;
        }

        let mut chunk = chunk;
        chunk.truncate(room);
        let kept = chunk.len();
        if kept > 0 {
            self.len += kept;
            self.chunks.push(chunk);
        }
        kept
    }

    /// Concatenate all buffered chunks, leaving the buffer empty
    pub fn take(&mut self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.len);
        for chunk in self.chunks.drain(..) {
            samples.extend_from_slice(&chunk);
        }
        self.len = 0;
        self.overflowed = false;
        samples
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.max_samples
    }

    pub fn capacity(&self) -> usize {
        self.max_samples
    }
}
