//! RIFF/WAVE packaging for 16-bit PCM.

use std::io::Cursor;

use super::AudioError;

/// Size of the canonical PCM WAV header.
pub const HEADER_LEN: usize = 44;

/// Build the canonical 44-byte header for `data_size` bytes of PCM.
pub fn create_header(
    data_size: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> [u8; HEADER_LEN] {
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
    let block_align = channels * bits_per_sample / 8;
    let riff_size = 36 + data_size;

    let mut header = [0u8; HEADER_LEN];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Wrap mono 16-bit PCM in a WAV container.
pub fn wrap_pcm16(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let header = create_header(pcm.len() as u32, sample_rate, 1, 16);
    let mut wav = Vec::with_capacity(HEADER_LEN + pcm.len());
    wav.extend_from_slice(&header);
    wav.extend_from_slice(pcm);
    wav
}

/// Samples read back out of a WAV container, downmixed to mono.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedWav {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

/// Parse a 16-bit integer WAV payload.
///
/// Multi-channel audio is averaged down to mono.
pub fn read_pcm16(bytes: &[u8]) -> Result<DecodedWav, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::InvalidWav(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::InvalidWav(format!(
            "expected 16-bit integer samples, got {:?} at {} bits",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let channels = usize::from(spec.channels.max(1));
    let interleaved = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AudioError::InvalidWav(e.to_string()))?;

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    };

    Ok(DecodedWav {
        sample_rate: spec.sample_rate,
        samples,
    })
}
