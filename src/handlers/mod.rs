//! HTTP and WebSocket request handlers
//!
//! - `media_stream` - audio transport bridge (mu-law frames in and out)
//! - `relay` - text transport bridge; the provider does its own speech
//! - `voice_webhook` - request/response markup flow driven by speech gathers
//! - `twiml_entry` - markup connecting a call to one of the live bridges
//! - `status` - provider status callbacks

pub mod media_stream;
pub mod relay;
pub mod socket;
pub mod status;
pub mod twiml_entry;
pub mod voice_webhook;

use serde::{Deserialize, Serialize};

use crate::core::session::CallContext;

pub use media_stream::media_stream_handler;
pub use relay::relay_handler;

/// Campaign parameters as they appear in query strings and in protocol-level
/// custom parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignParams {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
}

impl CampaignParams {
    /// Overlay the present values on `base`.
    pub fn apply(&self, base: CallContext) -> CallContext {
        base.with_overrides(
            self.business_name.as_deref(),
            self.product_category.as_deref(),
            self.brand_name.as_deref(),
        )
    }
}
