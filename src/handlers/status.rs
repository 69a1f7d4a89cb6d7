use axum::{Form, http::StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::telephony::CallStatus;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusCallback {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub call_status: Option<CallStatus>,
    #[serde(default)]
    pub call_duration: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub answered_by: Option<String>,
}

/// `POST /voice/status`: provider lifecycle callbacks, logged only.
pub async fn status_callback(Form(update): Form<StatusCallback>) -> StatusCode {
    let call_id = update.call_sid.as_deref().unwrap_or("unknown");
    match (&update.call_status, &update.error_code) {
        (_, Some(code)) => warn!(
            call_id = %call_id,
            status = ?update.call_status,
            error_code = %code,
            "Call reported an error"
        ),
        (Some(status), None) => info!(
            call_id = %call_id,
            status = ?status,
            terminal = status.is_terminal(),
            duration = ?update.call_duration,
            answered_by = ?update.answered_by,
            "Call status update"
        ),
        (None, None) => info!(call_id = %call_id, "Call status update without status"),
    }
    StatusCode::OK
}
