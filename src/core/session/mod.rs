//! Per-call state and the registry of live calls.
//!
//! A [`CallSession`] is shared between the connections attached to the call
//! and any turn task they spawn, so its mutable parts sit behind locks:
//!
//! - inbound audio and the in-flight flag under a short-lived `parking_lot`
//!   mutex, never held across an await
//! - the [`Conversation`] under a `tokio` mutex held for the whole dialogue
//!   turn, which keeps each user entry directly followed by its reply

mod registry;
mod sweeper;

pub use registry::SessionRegistry;
pub use sweeper::spawn_sweeper;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::dialogue::Stage;
use crate::core::stt::{AudioAccumulator, FlushPolicy};

pub type SessionHandle = Arc<CallSession>;

/// Campaign parameters attached to a call when it is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallContext {
    pub business_name: String,
    pub product_category: String,
    pub brand_name: String,
}

impl CallContext {
    /// Overlay any present values on top of `self`.
    pub fn with_overrides(
        mut self,
        business_name: Option<&str>,
        product_category: Option<&str>,
        brand_name: Option<&str>,
    ) -> Self {
        let pick = |target: &mut String, value: Option<&str>| {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                *target = value.to_string();
            }
        };
        pick(&mut self.business_name, business_name);
        pick(&mut self.product_category, product_category);
        pick(&mut self.brand_name, brand_name);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Dialogue state for one call.
///
/// History only grows, and only through [`Conversation::record_greeting`] and
/// [`Conversation::record_exchange`], so a user entry can never be separated
/// from the reply that answered it.
#[derive(Debug, Clone)]
pub struct Conversation {
    history: Vec<HistoryEntry>,
    turn_count: u32,
    /// Consecutive turns that could not be understood
    pub retry_attempts: u32,
    /// Position in the scripted flow. Unused by the generative policy.
    pub stage: Stage,
    ended: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            turn_count: 0,
            retry_attempts: 0,
            stage: Stage::Greeting,
            ended: false,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn is_greeted(&self) -> bool {
        !self.history.is_empty()
    }

    /// Whether a reply has already ended this call.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Record the opening line. Ignored once anything has been said.
    pub fn record_greeting(&mut self, text: &str) -> bool {
        if self.is_greeted() {
            return false;
        }
        self.history.push(HistoryEntry::new(Role::Assistant, text));
        true
    }

    /// Append one dialogue turn: the caller's utterance and the reply to it.
    pub fn record_exchange(&mut self, user: &str, assistant: &str, ends_call: bool) {
        self.history.push(HistoryEntry::new(Role::User, user));
        self.history.push(HistoryEntry::new(Role::Assistant, assistant));
        self.turn_count += 1;
        if ends_call {
            self.ended = true;
        }
    }

    /// Mark the call ended without recording a turn.
    pub fn mark_ended(&mut self) {
        self.ended = true;
    }
}

/// Caller audio waiting for transcription.
#[derive(Debug)]
pub struct AudioIntake {
    buffer: AudioAccumulator,
    processing: bool,
}

/// One live telephony call.
#[derive(Debug)]
pub struct CallSession {
    call_id: String,
    context: CallContext,
    created_at: Instant,
    stream_id: Mutex<Option<String>>,
    connections: AtomicUsize,
    evicted: AtomicBool,
    audio: Mutex<AudioIntake>,
    conversation: tokio::sync::Mutex<Conversation>,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>, context: CallContext) -> Self {
        let now = Instant::now();
        Self {
            call_id: call_id.into(),
            context,
            created_at: now,
            stream_id: Mutex::new(None),
            connections: AtomicUsize::new(0),
            evicted: AtomicBool::new(false),
            audio: Mutex::new(AudioIntake {
                buffer: AudioAccumulator::new(now),
                processing: false,
            }),
            conversation: tokio::sync::Mutex::new(Conversation::new()),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn stream_id(&self) -> Option<String> {
        self.stream_id.lock().clone()
    }

    /// Record the most recently attached stream leg. Empty ids are ignored.
    pub fn set_stream_id(&self, stream_id: &str) {
        if !stream_id.is_empty() {
            *self.stream_id.lock() = Some(stream_id.to_string());
        }
    }

    /// Number of live connections attached through the registry.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    pub(crate) fn attach(&self) {
        self.connections.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the number of connections still attached.
    pub(crate) fn detach(&self) -> usize {
        let previous = self
            .connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// True once the session has been removed from its registry.
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_evicted(&self) {
        self.evicted.store(true, Ordering::Release);
    }

    /// Exclusive access to the dialogue state for the duration of a turn.
    pub async fn conversation(&self) -> tokio::sync::MutexGuard<'_, Conversation> {
        self.conversation.lock().await
    }

    /// Take over the dialogue state of `other`, leaving it empty.
    ///
    /// Used when a call first seen under a placeholder id is re-keyed once
    /// its real id arrives.
    pub async fn adopt_conversation(&self, other: &CallSession) {
        let taken = std::mem::take(&mut *other.conversation().await);
        *self.conversation().await = taken;
    }

    /// Buffer an inbound audio chunk.
    pub fn push_audio(&self, chunk: Bytes) {
        self.audio.lock().buffer.accumulate(chunk);
    }

    pub fn pending_audio_bytes(&self) -> usize {
        self.audio.lock().buffer.pending_bytes()
    }

    pub fn is_processing(&self) -> bool {
        self.audio.lock().processing
    }

    /// Claim the buffered audio if a flush is due.
    ///
    /// On `Some`, the session is marked as processing and no further batch is
    /// released until [`CallSession::finish_processing`] is called.
    pub fn try_begin_flush(&self, policy: &FlushPolicy) -> Option<Bytes> {
        if self.is_evicted() {
            return None;
        }
        let now = Instant::now();
        let mut intake = self.audio.lock();
        if !intake.buffer.should_flush(policy, intake.processing, now) {
            return None;
        }
        intake.processing = true;
        Some(intake.buffer.drain(now))
    }

    /// Mark the session busy without claiming audio, e.g. while the greeting
    /// plays. Returns false if it was already busy or has been evicted.
    pub fn try_mark_processing(&self) -> bool {
        if self.is_evicted() {
            return false;
        }
        let mut intake = self.audio.lock();
        if intake.processing {
            return false;
        }
        intake.processing = true;
        true
    }

    pub fn finish_processing(&self) {
        self.audio.lock().processing = false;
    }
}
