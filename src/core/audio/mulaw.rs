//! G.711 mu-law companding.
//!
//! Telephony legs carry 8 kHz, 8-bit mu-law samples. Transcription services
//! want linear 16-bit PCM, so every inbound frame is expanded with [`decode`]
//! and every outbound sample is compressed with [`encode`].
//!
//! Both directions follow the ITU-T G.711 reference exactly. An approximate
//! expansion is audible on the line and measurably hurts transcription.

/// Bias added to the magnitude before segment lookup.
pub const BIAS: i32 = 0x84;

/// Largest magnitude that still fits the top segment once the bias is added.
pub const CLIP: i32 = 32635;

/// Expand a single mu-law byte to a linear 16-bit sample.
#[inline]
pub fn decode_sample(byte: u8) -> i16 {
    let ulaw = !byte;
    let sign = ulaw & 0x80;
    let exponent = (ulaw >> 4) & 0x07;
    let mantissa = i32::from(ulaw & 0x0F) | 0x10;

    let magnitude = (((mantissa << 1) + 1) << (exponent + 2)) - BIAS;

    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Compress a linear 16-bit sample to a mu-law byte.
#[inline]
pub fn encode_sample(sample: i16) -> u8 {
    let value = i32::from(sample);
    let sign: u8 = if value < 0 { 0x80 } else { 0x00 };

    // i32 so that -32768 does not overflow on negation
    let magnitude = value.abs().min(CLIP) + BIAS;

    // magnitude >= BIAS, so the shifted value is in 1..=255
    let segment = (magnitude >> 7) as u32;
    let exponent = (31 - segment.leading_zeros()) as u8;
    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Expand a mu-law buffer into little-endian 16-bit PCM.
///
/// The output is exactly twice as long as the input.
pub fn decode(companded: &[u8]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(companded.len() * 2);
    for &byte in companded {
        pcm.extend_from_slice(&decode_sample(byte).to_le_bytes());
    }
    pcm
}

/// Compress little-endian 16-bit PCM into mu-law.
///
/// A trailing odd byte is ignored.
pub fn encode(pcm16: &[u8]) -> Vec<u8> {
    pcm16
        .chunks_exact(2)
        .map(|pair| encode_sample(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Compress already-decoded samples into mu-law.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_vectors() {
        // Values from the G.711 reference tables
        assert_eq!(decode_sample(0xFF), 0);
        assert_eq!(decode_sample(0x7F), 0);
        assert_eq!(decode_sample(0xFE), 8);
        assert_eq!(decode_sample(0x7E), -8);
        assert_eq!(decode_sample(0xF0), 120);
        assert_eq!(decode_sample(0xEF), 132);
        assert_eq!(decode_sample(0x80), 32124);
        assert_eq!(decode_sample(0x00), -32124);
        assert_eq!(decode_sample(0xC0), 2876);
        assert_eq!(decode_sample(0x40), -2876);
    }

    #[test]
    fn test_encode_reference_vectors() {
        assert_eq!(encode_sample(0), 0xFF);
        assert_eq!(encode_sample(8), 0xFE);
        assert_eq!(encode_sample(-8), 0x7E);
        assert_eq!(encode_sample(32124), 0x80);
        assert_eq!(encode_sample(-32124), 0x00);
    }

    #[test]
    fn test_encode_clips_extremes() {
        assert_eq!(encode_sample(i16::MAX), 0x80);
        assert_eq!(encode_sample(i16::MIN), 0x00);
    }

    #[test]
    fn test_round_trip_every_byte() {
        for byte in 0u8..=255 {
            let expanded = decode_sample(byte);
            let recompressed = encode_sample(expanded);
            // 0x7F is negative zero and legitimately collapses to 0xFF
            if byte == 0x7F {
                assert_eq!(recompressed, 0xFF);
                continue;
            }
            assert_eq!(recompressed, byte, "byte {byte:#04x} did not survive");
            assert_eq!(decode_sample(recompressed), expanded);
        }
    }

    #[test]
    fn test_encode_error_within_one_step() {
        // Any linear sample lands within one quantization step of its decoded value.
        for sample in (-32000i32..=32000).step_by(37) {
            let sample = sample as i16;
            let decoded = i32::from(decode_sample(encode_sample(sample)));
            let exponent = (!encode_sample(sample) >> 4) & 0x07;
            let step = 1i32 << (exponent + 3);
            assert!(
                (decoded - i32::from(sample)).abs() <= step,
                "sample {sample} decoded to {decoded} (step {step})"
            );
        }
    }

    #[test]
    fn test_buffer_lengths() {
        let companded = vec![0xFFu8; 160];
        let pcm = decode(&companded);
        assert_eq!(pcm.len(), 320);
        assert!(pcm.iter().all(|&b| b == 0));

        let back = encode(&pcm);
        assert_eq!(back, companded);

        // odd trailing byte is dropped
        assert_eq!(encode(&[0, 0, 7]).len(), 1);
    }
}
