//! Keyword intent classification for caller utterances.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Affirmative,
    Negative,
    PricingInquiry,
    ScheduleFollowup,
    TransferRequest,
    Unclear,
    Silence,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Affirmative => "affirmative",
            Self::Negative => "negative",
            Self::PricingInquiry => "pricing_inquiry",
            Self::ScheduleFollowup => "schedule_followup",
            Self::TransferRequest => "transfer_request",
            Self::Unclear => "unclear",
            Self::Silence => "silence",
        }
    }

    /// Intents that carry no usable answer.
    pub fn needs_retry(&self) -> bool {
        matches!(self, Self::Unclear | Self::Silence)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
}

fn pattern(words: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b({words})\b")).ok()
}

// Refusal phrases are checked first so "not interested" never reads as interest.
static REFUSAL: Lazy<Option<Regex>> = Lazy::new(|| {
    pattern(r"not interested|no thanks|no thank you|don'?t call|stop calling|remove me")
});
static SCHEDULE: Lazy<Option<Regex>> =
    Lazy::new(|| pattern(r"call back|call me back|later|schedule|another time|busy|not now"));
static TRANSFER: Lazy<Option<Regex>> =
    Lazy::new(|| pattern(r"owner|manager|decision maker|boss|supervisor"));
static PRICING: Lazy<Option<Regex>> =
    Lazy::new(|| pattern(r"price|prices|pricing|cost|costs|how much|expensive|cheap|afford"));
static AFFIRMATIVE: Lazy<Option<Regex>> =
    Lazy::new(|| pattern(r"yes|yeah|yep|sure|absolutely|definitely|interested|sounds good"));
static NEGATIVE: Lazy<Option<Regex>> = Lazy::new(|| pattern(r"no|nope|don'?t|stop"));

/// Classify an utterance. Confidence below `floor` is reported as unclear.
pub fn classify(text: &str, confidence: f32, floor: f32) -> Classification {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Classification {
            intent: Intent::Silence,
            confidence: 0.0,
        };
    }
    if confidence < floor {
        return Classification {
            intent: Intent::Unclear,
            confidence,
        };
    }

    let rules: [(Option<&Regex>, Intent); 6] = [
        (Option::as_ref(&REFUSAL), Intent::Negative),
        (Option::as_ref(&SCHEDULE), Intent::ScheduleFollowup),
        (Option::as_ref(&TRANSFER), Intent::TransferRequest),
        (Option::as_ref(&PRICING), Intent::PricingInquiry),
        (Option::as_ref(&AFFIRMATIVE), Intent::Affirmative),
        (Option::as_ref(&NEGATIVE), Intent::Negative),
    ];
    let intent = rules
        .iter()
        .find(|(regex, _)| regex.is_some_and(|r| r.is_match(&text)))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Unclear);

    Classification { intent, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_of(text: &str) -> Intent {
        classify(text, 0.9, 0.5).intent
    }

    #[test]
    fn test_patterns_compile() {
        for regex in [&REFUSAL, &SCHEDULE, &TRANSFER, &PRICING, &AFFIRMATIVE, &NEGATIVE] {
            assert!(regex.is_some());
        }
    }

    #[test]
    fn test_basic_intents() {
        assert_eq!(intent_of("Yeah, sure"), Intent::Affirmative);
        assert_eq!(intent_of("nope"), Intent::Negative);
        assert_eq!(intent_of("How much does it cost?"), Intent::PricingInquiry);
        assert_eq!(intent_of("I'm busy right now"), Intent::ScheduleFollowup);
        assert_eq!(intent_of("You should talk to the owner"), Intent::TransferRequest);
        assert_eq!(intent_of("the weather is nice"), Intent::Unclear);
    }

    #[test]
    fn test_refusal_beats_interest() {
        assert_eq!(intent_of("not interested"), Intent::Negative);
        assert_eq!(intent_of("I'm really not interested, thanks"), Intent::Negative);
        assert_eq!(intent_of("Please don't call me again"), Intent::Negative);
        assert_eq!(intent_of("dont call"), Intent::Negative);
    }

    #[test]
    fn test_specific_intents_beat_bare_yes_no() {
        assert_eq!(intent_of("yes, what's the price"), Intent::PricingInquiry);
        assert_eq!(intent_of("no, call me back later"), Intent::ScheduleFollowup);
        assert_eq!(intent_of("yes let me get my manager"), Intent::TransferRequest);
    }

    #[test]
    fn test_word_boundaries() {
        // "no" inside another word is not a refusal
        assert_eq!(intent_of("I know"), Intent::Unclear);
        assert_eq!(intent_of("nobody home"), Intent::Unclear);
    }

    #[test]
    fn test_silence_and_low_confidence() {
        let silent = classify("   ", 0.9, 0.5);
        assert_eq!(silent.intent, Intent::Silence);
        assert_eq!(silent.confidence, 0.0);

        let mumbled = classify("yes", 0.3, 0.5);
        assert_eq!(mumbled.intent, Intent::Unclear);
        assert_eq!(mumbled.confidence, 0.3);

        assert!(Intent::Silence.needs_retry());
        assert!(!Intent::Negative.needs_retry());
    }
}
