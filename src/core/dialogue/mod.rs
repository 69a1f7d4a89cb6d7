//! Dialogue policies: deciding what to say next and when to hang up.
//!
//! Two policies share one contract. [`ScriptedPolicy`] walks a fixed sales
//! script driven by keyword intents. [`GenerativePolicy`] hands the whole
//! conversation to a chat model and watches for the end-of-call sentinel.
//!
//! Policies never touch history directly. They return a [`TurnResult`] and the
//! caller records the exchange, so an utterance and its reply always land in
//! history together.

mod generative;
pub mod intent;
pub mod prompts;
mod scripted;

use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;

pub use generative::GenerativePolicy;
pub use intent::{Classification, Intent, classify};
pub use scripted::ScriptedPolicy;

use crate::core::session::{CallContext, Conversation};

/// Which dialogue policy drives a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Scripted,
    Generative,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scripted => "scripted",
            Self::Generative => "generative",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scripted" | "script" => Ok(Self::Scripted),
            "generative" | "llm" => Ok(Self::Generative),
            other => Err(format!(
                "unknown dialogue policy '{other}', expected 'scripted' or 'generative'"
            )),
        }
    }
}

/// Position in the scripted sales flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Greeting,
    InterestCheck,
    Pricing,
    Scheduling,
    Closing,
}

/// What to say next and whether the call ends after saying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub response_text: String,
    pub should_end_call: bool,
}

impl TurnResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            should_end_call: false,
        }
    }

    pub fn hangup(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            should_end_call: true,
        }
    }
}

#[async_trait]
pub trait DialoguePolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Opening line, spoken before the caller says anything.
    fn greeting(&self, ctx: &CallContext) -> String;

    /// Decide the reply to `utterance`. Must not fail: downstream errors are
    /// turned into a spoken fallback.
    async fn next_turn(
        &self,
        conversation: &mut Conversation,
        ctx: &CallContext,
        utterance: &str,
        confidence: f32,
    ) -> TurnResult;
}

/// Ask the caller to try again, or give up once `max_retries` prompts have
/// gone unanswered.
pub fn retry_or_end(
    conversation: &mut Conversation,
    max_retries: u32,
    reprompt: &str,
) -> TurnResult {
    if conversation.retry_attempts < max_retries {
        conversation.retry_attempts += 1;
        TurnResult::reply(reprompt)
    } else {
        TurnResult::hangup(prompts::CONNECTION_TROUBLE)
    }
}
