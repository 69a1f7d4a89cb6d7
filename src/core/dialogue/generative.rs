use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DialoguePolicy, PolicyKind, TurnResult, prompts};
use crate::core::llm::{ChatCompletion, ChatMessage};
use crate::core::session::{CallContext, Conversation, Role};

/// Free-form conversation driven by a chat model.
pub struct GenerativePolicy {
    llm: Arc<dyn ChatCompletion>,
    max_turns: u32,
    timeout: Duration,
}

impl GenerativePolicy {
    pub fn new(llm: Arc<dyn ChatCompletion>, max_turns: u32, timeout: Duration) -> Self {
        Self {
            llm,
            max_turns,
            timeout,
        }
    }

    fn build_messages(
        conversation: &Conversation,
        ctx: &CallContext,
        utterance: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(conversation.history().len() + 2);
        messages.push(ChatMessage::system(prompts::system_instruction(ctx)));
        messages.extend(
            conversation
                .history()
                .iter()
                .map(|entry| ChatMessage::new(entry.role, entry.text.clone())),
        );
        messages.push(ChatMessage::new(Role::User, utterance));
        messages
    }
}

/// Split the end-of-call sentinel off a generated reply.
pub(crate) fn parse_reply(raw: &str) -> TurnResult {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix(prompts::END_CALL_SENTINEL) {
        let text = rest.trim();
        // a bare sentinel still needs something to say before hanging up
        let text = if text.is_empty() { prompts::WRAP_UP } else { text };
        return TurnResult::hangup(text);
    }
    if raw.is_empty() {
        return TurnResult::reply(prompts::EMPTY_REPLY);
    }
    TurnResult::reply(raw)
}

#[async_trait]
impl DialoguePolicy for GenerativePolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Generative
    }

    fn greeting(&self, ctx: &CallContext) -> String {
        prompts::generative_greeting(ctx)
    }

    async fn next_turn(
        &self,
        conversation: &mut Conversation,
        ctx: &CallContext,
        utterance: &str,
        _confidence: f32,
    ) -> TurnResult {
        if conversation.turn_count() + 1 >= self.max_turns {
            debug!(turns = conversation.turn_count(), "Turn cap reached, wrapping up");
            return TurnResult::hangup(prompts::WRAP_UP);
        }

        let messages = Self::build_messages(conversation, ctx, utterance);
        let outcome = tokio::time::timeout(self.timeout, self.llm.complete(&messages)).await;

        match outcome {
            Ok(Ok(raw)) => parse_reply(&raw),
            Ok(Err(e)) => {
                warn!(provider = self.llm.provider_name(), error = %e, "Generation failed");
                TurnResult::hangup(prompts::GENERATION_FAILURE)
            }
            Err(_) => {
                warn!(
                    provider = self.llm.provider_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Generation timed out"
                );
                TurnResult::hangup(prompts::GENERATION_FAILURE)
            }
        }
    }
}
