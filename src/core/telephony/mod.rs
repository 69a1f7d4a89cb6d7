//! Outbound call placement and status lookup.

mod twilio;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub use twilio::{TwilioClient, TwilioConfig};

use crate::core::session::CallContext;

/// Twilio error code for an unverified destination on a trial account.
pub const UNVERIFIED_NUMBER_CODE: i64 = 21608;

#[derive(Debug, thiserror::Error)]
pub enum TelephonyError {
    #[error("telephony not configured: {0}")]
    NotConfigured(String),
    #[error("telephony network error: {0}")]
    Network(String),
    #[error("telephony API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("unexpected telephony response: {0}")]
    InvalidResponse(String),
}

impl TelephonyError {
    /// True when a trial account tried to dial a number it has not verified.
    pub fn is_unverified_number(&self) -> bool {
        matches!(self, Self::Api { code: Some(UNVERIFIED_NUMBER_CODE), .. })
    }
}

/// Lifecycle state reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
    #[serde(untagged)]
    Other(String),
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Busy | Self::Failed | Self::NoAnswer | Self::Canceled
        )
    }
}

/// Request to dial a number and fetch call instructions from `url`.
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub to: String,
    /// Overrides the configured caller id
    pub from: Option<String>,
    pub url: String,
    pub status_callback: Option<String>,
    pub machine_detection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallRecord {
    pub sid: String,
    pub status: CallStatus,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Which conversation flow an outbound call is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Raw audio over the media stream socket
    #[default]
    Stream,
    /// Text prompts over the conversation relay socket
    Relay,
    /// Speech-gather webhooks, one request per turn
    Gather,
}

impl CallMode {
    /// Path serving the first call instructions for this mode.
    pub fn entry_path(&self) -> &'static str {
        match self {
            Self::Stream => "/voice/stream-twiml",
            Self::Relay => "/voice/relay-twiml",
            Self::Gather => "/voice/start",
        }
    }
}

impl FromStr for CallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stream" | "media-stream" => Ok(Self::Stream),
            "relay" => Ok(Self::Relay),
            "gather" | "webhook" => Ok(Self::Gather),
            other => Err(format!("unknown call mode '{other}', expected stream, relay or gather")),
        }
    }
}

/// Absolute URL of the entry point for `mode`, carrying the campaign context.
pub fn entry_url(
    base_url: &str,
    mode: CallMode,
    ctx: &CallContext,
) -> Result<String, TelephonyError> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), mode.entry_path());
    let mut url = Url::parse(&raw)
        .map_err(|e| TelephonyError::NotConfigured(format!("invalid public URL {raw}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("businessName", &ctx.business_name)
        .append_pair("productCategory", &ctx.product_category)
        .append_pair("brandName", &ctx.brand_name);
    Ok(url.into())
}

/// Absolute URL of the status callback endpoint.
pub fn status_callback_url(base_url: &str) -> String {
    format!("{}/voice/status", base_url.trim_end_matches('/'))
}

#[async_trait]
pub trait TelephonyClient: Send + Sync {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallRecord, TelephonyError>;

    async fn fetch_call(&self, call_sid: &str) -> Result<CallRecord, TelephonyError>;
}
