use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{media_stream_handler, relay_handler, status, twiml_entry, voice_webhook};
use crate::state::AppState;

/// Create the voice router
///
/// # Endpoints
///
/// - `GET /voice/media-stream` - WebSocket, audio bridge
/// - `GET /voice/relay` - WebSocket, text bridge (`conversation-relay.v1`)
/// - `POST /voice/start`, `POST /voice/handle` - markup-driven call flow
/// - `GET|POST /voice/stream-twiml`, `GET|POST /voice/relay-twiml` - markup
///   connecting a call to one of the bridges
/// - `POST /voice/status` - provider status callbacks
pub fn create_voice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice/media-stream", get(media_stream_handler))
        .route("/voice/relay", get(relay_handler))
        .route("/voice/start", post(voice_webhook::start_call))
        .route(voice_webhook::HANDLE_PATH, post(voice_webhook::handle_speech))
        .route(
            "/voice/stream-twiml",
            get(twiml_entry::stream_twiml).post(twiml_entry::stream_twiml),
        )
        .route(
            "/voice/relay-twiml",
            get(twiml_entry::relay_twiml).post(twiml_entry::relay_twiml),
        )
        .route("/voice/status", post(status::status_callback))
        .layer(TraceLayer::new_for_http())
}

/// Router with state attached, ready to serve.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "OK" }))
        .merge(create_voice_router())
        .with_state(state)
}
