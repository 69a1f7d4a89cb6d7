use serde::{Deserialize, Serialize};

use crate::handlers::CampaignParams;

/// Incoming relay messages
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayIncoming {
    #[serde(rename_all = "camelCase")]
    Setup {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        call_sid: Option<String>,
        #[serde(default)]
        custom_parameters: CampaignParams,
    },
    #[serde(rename_all = "camelCase")]
    Prompt {
        #[serde(default)]
        voice_prompt: String,
        #[serde(default)]
        confidence: Option<f32>,
        /// False for partial results
        #[serde(default)]
        last: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Interrupt {
        #[serde(default)]
        utterance_until_interrupt: Option<String>,
    },
    Dtmf {
        #[serde(default)]
        digit: Option<String>,
    },
    Error {
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Outgoing relay messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayOutgoing {
    Text { token: String, last: bool },
    End,
}

impl RelayOutgoing {
    /// A complete utterance, never streamed token by token.
    pub fn utterance(text: impl Into<String>) -> Self {
        Self::Text {
            token: text.into(),
            last: true,
        }
    }
}
