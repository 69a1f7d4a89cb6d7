//! Request/response call flow
//!
//! Each caller utterance arrives as a speech gather result posted by the
//! provider; each response is a markup document saying the reply and
//! gathering the next answer.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::dialogue::prompts;
use crate::core::session::SessionHandle;
use crate::core::twiml::{self, Gather, TwimlResponse};
use crate::handlers::CampaignParams;
use crate::state::AppState;

pub const HANDLE_PATH: &str = "/voice/handle";

const GREETING_HINTS: &str = "yes,no,sure,yeah,not interested,busy,later";
const TURN_HINTS: &str =
    "yes,no,price,pricing,cost,owner,manager,later,call back,not interested,busy";

/// Fields posted by the provider. Everything else in the form is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceForm {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub speech_result: Option<String>,
    /// Sent as a decimal string, e.g. `0.91`
    #[serde(default)]
    pub confidence: Option<String>,
}

impl VoiceForm {
    fn call_id(&self) -> String {
        self.call_sid
            .clone()
            .filter(|sid| !sid.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    fn confidence(&self) -> Option<f32> {
        self.confidence
            .as_deref()
            .and_then(|value| value.trim().parse::<f32>().ok())
    }
}

fn markup(body: String) -> Response {
    ([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], body).into_response()
}

/// `POST /voice/start`: greet and gather the first answer.
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CampaignParams>,
    Form(form): Form<VoiceForm>,
) -> Response {
    let call_id = form.call_id();
    let context = params.apply(state.config.campaign.context());
    let (session, created) = state.registry.get_or_create(&call_id, context);
    info!(call_id = %call_id, created, "Webhook call started");

    let greeting = match state.webhook.greet(&session).await {
        Some(greeting) => greeting,
        // repeated start: say the opener again without touching history
        None => prompts::scripted_greeting(session.context()),
    };

    let voice = &state.config.speech.say_voice;
    markup(
        TwimlResponse::new()
            .say(voice, &greeting)
            .gather(&Gather::speech(HANDLE_PATH, GREETING_HINTS))
            .say(voice, prompts::NO_RESPONSE_PROMPT)
            .redirect(HANDLE_PATH)
            .build(),
    )
}

/// `POST /voice/handle`: run one dialogue turn for a gather result.
pub async fn handle_speech(
    State(state): State<Arc<AppState>>,
    Form(form): Form<VoiceForm>,
) -> Response {
    let call_id = form.call_id();
    let session = match state.registry.get(&call_id) {
        Some(session) => session,
        None => {
            info!(call_id = %call_id, "Speech for unknown call, creating session");
            state
                .registry
                .get_or_create(&call_id, state.config.campaign.context())
                .0
        }
    };

    let speech = form.speech_result.as_deref().unwrap_or_default();
    debug!(call_id = %call_id, speech = %speech, confidence = ?form.confidence(), "Gather result");

    let voice = &state.config.speech.say_voice;
    let Some(result) = state
        .webhook
        .handle_utterance(&session, speech, form.confidence())
        .await
    else {
        return markup(TwimlResponse::new().hangup().build());
    };

    if result.should_end_call {
        schedule_removal(&state, session);
        return markup(
            TwimlResponse::new()
                .say(voice, &result.response_text)
                .pause(1)
                .hangup()
                .build(),
        );
    }

    markup(
        TwimlResponse::new()
            .say(voice, &result.response_text)
            .gather(&Gather::speech(HANDLE_PATH, TURN_HINTS))
            .say(voice, prompts::NO_INPUT_RETRY)
            .redirect(HANDLE_PATH)
            .build(),
    )
}

/// Keep a finished conversation around briefly for late callbacks.
fn schedule_removal(state: &Arc<AppState>, session: SessionHandle) {
    let registry = Arc::clone(&state.registry);
    let grace = state.config.calls.end_grace();
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        registry.remove_session(&session);
    });
}
