//! Inbound audio buffering ahead of batch transcription.

use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};

/// When buffered caller audio is handed to the transcriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Minimum buffered mu-law bytes. 8000 bytes is one second of audio.
    pub min_bytes: usize,
    /// Minimum time since the previous flush (or since the buffer was created).
    pub min_interval: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            min_bytes: crate::config::DEFAULT_MIN_FLUSH_BYTES,
            min_interval: Duration::from_millis(crate::config::DEFAULT_MIN_FLUSH_INTERVAL_MS),
        }
    }
}

/// Ordered store of raw mu-law chunks awaiting transcription.
#[derive(Debug)]
pub struct AudioAccumulator {
    chunks: Vec<Bytes>,
    pending_bytes: usize,
    last_flush_at: Instant,
}

impl AudioAccumulator {
    pub fn new(now: Instant) -> Self {
        Self {
            chunks: Vec::new(),
            pending_bytes: 0,
            last_flush_at: now,
        }
    }

    pub fn accumulate(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.pending_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    pub fn last_flush_at(&self) -> Instant {
        self.last_flush_at
    }

    /// All three conditions must hold: enough audio, enough time since the
    /// last flush, and no transcription already running for this call.
    pub fn should_flush(&self, policy: &FlushPolicy, in_flight: bool, now: Instant) -> bool {
        !in_flight
            && self.pending_bytes >= policy.min_bytes
            && now.saturating_duration_since(self.last_flush_at) >= policy.min_interval
    }

    /// Concatenate and clear the buffer, restarting the interval clock.
    pub fn drain(&mut self, now: Instant) -> Bytes {
        self.last_flush_at = now;
        self.pending_bytes = 0;

        let mut chunks = std::mem::take(&mut self.chunks);
        if chunks.len() == 1 {
            return chunks.pop().unwrap_or_default();
        }

        let total = chunks.iter().map(Bytes::len).sum();
        let mut combined = BytesMut::with_capacity(total);
        for chunk in chunks {
            combined.extend_from_slice(&chunk);
        }
        combined.freeze()
    }
}
