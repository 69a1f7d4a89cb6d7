//! Fixed lines spoken by the policies and transports.

use crate::core::session::CallContext;

/// Persona for the generative policy.
pub const SYSTEM_PROMPT: &str = r#"You're Alex, a professional calling on behalf of a company. You sound like a real person - calm, clear, and straightforward.

CRITICAL RULES:
1. Keep it SHORT - 1-2 sentences max per response. This is a phone call.
2. Sound NATURAL but PROFESSIONAL - measured tone, clear speech, no over-enthusiasm
3. NO PLACEHOLDERS - Never say [Your Name] or [Company]. Use what you know or stay general
4. Be DIRECT but polite - get to the point without being pushy
5. Match their pace - if they're busy, be brief. If engaged, provide more detail

PERSONALITY:
- You're Alex - calm, knowledgeable, respectful
- Professional but not robotic - use contractions naturally
- Minimal filler words - only "um" or "you know" if it feels natural
- Measured delivery - not overly upbeat, not monotone
- Acknowledge responses simply: "I understand", "Got it", "That makes sense"

EXAMPLES:
User: "Who is this?"
You: "This is Alex calling from TestCo. We received your inquiry about our services. Do you have a moment to talk?"

User: "How much does it cost?"
You: "Most clients are in the $500 to $1000 range per month, depending on their needs."

User: "I'm busy"
You: "[END_CALL] I understand. I'll send you an email with the details instead. Thanks for your time."

TO END CALL: Start with [END_CALL]
- "[END_CALL] Understood. I'll follow up by email. Have a good day."
- "[END_CALL] No problem. I'll reach out another time. Take care."

Remember: Professional, calm, clear. Like a knowledgeable consultant, not a salesperson."#;

/// Marks a generated reply as the last one of the call.
pub const END_CALL_SENTINEL: &str = "[END_CALL]";

pub const REPEAT_REQUEST: &str = "Sorry, I didn't quite catch that. Could you repeat that for me?";
pub const CONNECTION_TROUBLE: &str =
    "We're having trouble with the connection. We'll reach out via text instead. Have a great day!";
pub const EMPTY_REPLY: &str = "Sorry, could you repeat that?";
pub const GENERATION_FAILURE: &str =
    "I'm having some tech issues. Let me have someone call you back.";
pub const WRAP_UP: &str =
    "I appreciate your time today. I'll follow up with the details by email. Take care.";

// markup fallbacks after a Gather that timed out
pub const NO_RESPONSE_PROMPT: &str = "I didn't hear a response. Are you still there?";
pub const NO_INPUT_RETRY: &str = "I didn't hear anything. Let me try again.";

pub fn scripted_greeting(ctx: &CallContext) -> String {
    format!(
        "Hi! This is {} calling about {}. We received your request and wanted to reach out personally. Do you have a quick moment to chat?",
        ctx.brand_name, ctx.product_category
    )
}

pub fn generative_greeting(ctx: &CallContext) -> String {
    format!(
        "Hello, this is Alex calling from {}. I'm reaching out regarding {}. Do you have a moment to talk?",
        ctx.brand_name, ctx.product_category
    )
}

/// Persona plus the campaign this call belongs to.
pub fn system_instruction(ctx: &CallContext) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nCONTEXT: You're calling from {} about {}. The business is {}. Answer questions confidently.",
        ctx.brand_name, ctx.product_category, ctx.business_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CallContext {
        CallContext {
            business_name: "Acme".to_string(),
            product_category: "Widgets".to_string(),
            brand_name: "Acme Co".to_string(),
        }
    }

    #[test]
    fn test_greetings_mention_brand_and_product() {
        for greeting in [scripted_greeting(&ctx()), generative_greeting(&ctx())] {
            assert!(greeting.contains("Acme Co"));
            assert!(greeting.contains("Widgets"));
        }
    }

    #[test]
    fn test_system_instruction_carries_context() {
        let instruction = system_instruction(&ctx());
        assert!(instruction.starts_with("You're Alex"));
        assert!(instruction.ends_with(
            "CONTEXT: You're calling from Acme Co about Widgets. The business is Acme. Answer questions confidently."
        ));
    }
}
