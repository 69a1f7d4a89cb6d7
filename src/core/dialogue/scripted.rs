use async_trait::async_trait;
use tracing::debug;

use super::intent::{Intent, classify};
use super::{DialoguePolicy, PolicyKind, Stage, TurnResult, prompts, retry_or_end};
use crate::core::session::{CallContext, Conversation};

/// Deterministic sales script keyed on (stage, intent).
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    confidence_floor: f32,
    max_retries: u32,
}

impl ScriptedPolicy {
    pub fn new(confidence_floor: f32, max_retries: u32) -> Self {
        Self {
            confidence_floor,
            max_retries,
        }
    }
}

/// Line used when the caller's answer did not fit the current question.
fn reprompt(stage: Stage) -> &'static str {
    match stage {
        Stage::Greeting => {
            "I didn't quite catch that. Are you interested in learning more about our services?"
        }
        Stage::InterestCheck => "Would you be interested in hearing about our pricing and options?",
        Stage::Pricing => "Should we send you our pricing information via text?",
        Stage::Scheduling => {
            "Would you like to hear about our pricing, or should we set up a follow-up call?"
        }
        Stage::Closing => "Thank you so much for your time. We'll be in touch soon. Have a great day!",
    }
}

/// Transition table. Returns the line, the next stage and whether to hang up.
fn transition(stage: Stage, intent: Intent) -> (&'static str, Stage, bool) {
    use Intent::*;
    use Stage::*;

    match (stage, intent) {
        (Greeting, Affirmative) => (
            "Great! Let me tell you a bit more about what we offer.",
            InterestCheck,
            false,
        ),
        (Greeting, Negative) => (
            "No problem at all. Thanks for your time, and have a wonderful day!",
            Greeting,
            true,
        ),
        (Greeting, ScheduleFollowup) => (
            "I understand you're busy. We'll follow up with you via text shortly. Have a great day!",
            Greeting,
            true,
        ),
        (Greeting, TransferRequest) => (
            "I'd be happy to have someone from our team reach out directly. We'll have a manager contact you shortly. Thanks for your time!",
            Greeting,
            true,
        ),
        (Greeting, PricingInquiry) => (
            "Great question! We have very competitive pricing. Would you like us to send you a detailed quote via text?",
            Pricing,
            false,
        ),

        (InterestCheck, PricingInquiry) => (
            "Our pricing is very competitive. We'd love to provide you with a custom quote. Would you like us to send that over via text?",
            Pricing,
            false,
        ),
        (InterestCheck, Affirmative) => (
            "Excellent! Would you like to know about our pricing, or should we schedule a follow-up call?",
            Scheduling,
            false,
        ),
        (InterestCheck, Negative) => (
            "I appreciate your time. If anything changes, feel free to reach out. Take care!",
            InterestCheck,
            true,
        ),
        (InterestCheck, ScheduleFollowup) => (
            "No problem! We'll follow up with you at a better time. Thank you!",
            InterestCheck,
            true,
        ),
        (InterestCheck, TransferRequest) => (
            "Absolutely! I'll make sure one of our senior team members reaches out to you directly. Have a great day!",
            InterestCheck,
            true,
        ),

        (Pricing | Scheduling, PricingInquiry) | (Pricing, Affirmative) => (
            "Perfect! We'll send you detailed pricing via text message shortly. Is there anything else I can help with?",
            Closing,
            false,
        ),
        (Pricing | Scheduling, ScheduleFollowup) | (Scheduling, Affirmative) => (
            "Sounds good. We'll reach out to schedule a convenient time. Thanks so much!",
            stage,
            true,
        ),
        (Pricing | Scheduling, Negative) => {
            ("No worries. Thanks for your time today!", stage, true)
        }
        (Pricing | Scheduling, TransferRequest) => (
            "I completely understand. We'll have a senior team member contact you with all the pricing details. Thanks for your interest!",
            stage,
            true,
        ),

        (Closing, TransferRequest) => (
            "Absolutely! We'll have a manager reach out to you directly. Thank you so much for your time!",
            Closing,
            true,
        ),
        (Closing, ScheduleFollowup) => (
            "Perfect! We'll be in touch to schedule a follow-up. Have a wonderful day!",
            Closing,
            true,
        ),
        (Closing, _) => (reprompt(Closing), Closing, true),

        (_, Unclear | Silence) => (reprompt(stage), stage, false),
    }
}

#[async_trait]
impl DialoguePolicy for ScriptedPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Scripted
    }

    fn greeting(&self, ctx: &CallContext) -> String {
        prompts::scripted_greeting(ctx)
    }

    async fn next_turn(
        &self,
        conversation: &mut Conversation,
        _ctx: &CallContext,
        utterance: &str,
        confidence: f32,
    ) -> TurnResult {
        let stage = conversation.stage;
        let classification = classify(utterance, confidence, self.confidence_floor);
        debug!(
            stage = ?stage,
            intent = %classification.intent,
            confidence = classification.confidence,
            "Classified caller intent"
        );

        // the closing stage says goodbye whatever was heard
        if classification.intent.needs_retry() && stage != Stage::Closing {
            return retry_or_end(conversation, self.max_retries, reprompt(stage));
        }

        conversation.retry_attempts = 0;
        let (line, next_stage, hangup) = transition(stage, classification.intent);
        conversation.stage = next_stage;

        if hangup {
            TurnResult::hangup(line)
        } else {
            TurnResult::reply(line)
        }
    }
}
