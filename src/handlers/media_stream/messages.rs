use serde::{Deserialize, Serialize};

use crate::handlers::CampaignParams;

/// Incoming media stream events
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaStreamIncoming {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        start: StreamStart,
    },
    Media {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        media: MediaPayload,
    },
    Mark {
        #[serde(default)]
        mark: Option<MarkName>,
    },
    Dtmf {
        #[serde(default)]
        dtmf: Option<serde_json::Value>,
    },
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    #[serde(default)]
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: String,
    #[serde(default)]
    pub custom_parameters: CampaignParams,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaPayload {
    /// `inbound` for caller audio; absent on some test harnesses
    #[serde(default)]
    pub track: Option<String>,
    pub payload: String,
}

impl MediaPayload {
    pub fn is_inbound(&self) -> bool {
        self.track.as_deref().is_none_or(|track| track == "inbound")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarkName {
    pub name: String,
}

/// Outgoing media stream events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaStreamOutgoing {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutgoingPayload,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: OutgoingMark,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingPayload {
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingMark {
    pub name: String,
}

impl MediaStreamOutgoing {
    pub fn media(stream_sid: &str, payload: String) -> Self {
        Self::Media {
            stream_sid: stream_sid.to_string(),
            media: OutgoingPayload { payload },
        }
    }

    pub fn mark(stream_sid: &str, name: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid: stream_sid.to_string(),
            mark: OutgoingMark { name: name.into() },
        }
    }
}
