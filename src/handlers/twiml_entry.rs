//! Markup that connects an answered call to one of the live bridges.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::info;
use url::Url;

use crate::core::session::CallContext;
use crate::core::twiml::{self, TwimlResponse};
use crate::errors::{AppError, AppResult};
use crate::handlers::CampaignParams;
use crate::state::AppState;

pub const MEDIA_STREAM_PATH: &str = "/voice/media-stream";
pub const RELAY_PATH: &str = "/voice/relay";

/// `GET|POST /voice/stream-twiml`
pub async fn stream_twiml(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CampaignParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let context = params.apply(state.config.campaign.context());
    let url = socket_url(&state, &headers, MEDIA_STREAM_PATH, &context)?;
    info!(url = %url, "Connecting call to media stream");

    let body = TwimlResponse::new()
        .connect_stream(&url, &parameters(&context))
        .build();
    Ok(([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], body).into_response())
}

/// `GET|POST /voice/relay-twiml`
pub async fn relay_twiml(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CampaignParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let context = params.apply(state.config.campaign.context());
    let url = socket_url(&state, &headers, RELAY_PATH, &context)?;
    info!(url = %url, "Connecting call to text relay");

    let body = TwimlResponse::new()
        .connect_relay(&url, None, &parameters(&context))
        .build();
    Ok(([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], body).into_response())
}

fn parameters(context: &CallContext) -> [(&'static str, &str); 3] {
    [
        ("businessName", context.business_name.as_str()),
        ("productCategory", context.product_category.as_str()),
        ("brandName", context.brand_name.as_str()),
    ]
}

/// Build the `ws(s)://` URL of a bridge endpoint.
///
/// Uses the configured public URL when set, otherwise the request `Host`
/// header with `wss`.
fn socket_url(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    context: &CallContext,
) -> AppResult<String> {
    let base = match state.config.public_base_url() {
        Some(public) => {
            if let Some(rest) = public.strip_prefix("https://") {
                format!("wss://{rest}")
            } else if let Some(rest) = public.strip_prefix("http://") {
                format!("ws://{rest}")
            } else {
                public.to_string()
            }
        }
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest("no public URL configured and no Host header".to_string())
                })?;
            format!("wss://{host}")
        }
    };

    let mut url = Url::parse(&format!("{base}{path}"))
        .map_err(|e| AppError::Internal(format!("invalid socket URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("businessName", &context.business_name)
        .append_pair("productCategory", &context.product_category)
        .append_pair("brandName", &context.brand_name);
    Ok(url.into())
}
