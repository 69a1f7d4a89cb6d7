//! Telephony audio primitives: mu-law companding, WAV packaging, rate
//! conversion and outbound framing.

pub mod mulaw;
pub mod resample;
pub mod wav;

/// Sample rate of the telephony leg.
pub const LINE_SAMPLE_RATE: u32 = 8000;

/// Bytes per outbound media frame. One mu-law byte per sample, so 20 ms.
pub const FRAME_BYTES: usize = 160;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("invalid WAV payload: {0}")]
    InvalidWav(String),
}

/// Split mu-law audio into line frames. The last frame may be short.
pub fn frames(ulaw: &[u8], frame_bytes: usize) -> impl Iterator<Item = &[u8]> {
    ulaw.chunks(frame_bytes.max(1))
}

/// Number of frames [`frames`] yields for `len` bytes.
pub fn frame_count(len: usize, frame_bytes: usize) -> usize {
    len.div_ceil(frame_bytes.max(1))
}
