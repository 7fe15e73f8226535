use crate::{BridgeError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

/// Mono/interleaved sample format of a capture stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::mono(16000)
    }
}

/// Encode f32 samples (range -1.0 to 1.0) as a 16-bit PCM WAV file in memory
pub fn encode_wav(samples: &[f32], format: AudioFormat) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| BridgeError::Io(format!("Failed to create WAV writer: {}", e)))?;

        for &sample in samples {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| BridgeError::Io(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| BridgeError::Io(format!("Failed to finalize WAV data: {}", e)))?;
    }

    let bytes = cursor.into_inner();
    debug!(
        "Encoded {} samples at {} Hz into {} WAV bytes",
        samples.len(),
        format.sample_rate,
        bytes.len()
    );
    Ok(bytes)
}
