use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::audio;
use crate::core::engine::ConversationEngine;
use crate::core::session::{CallContext, SessionHandle, SessionRegistry};
use crate::handlers::CampaignParams;
use crate::handlers::socket::{
    CHANNEL_BUFFER_SIZE, MAX_WS_MESSAGE_SIZE, MessageRoute, RouteSender, spawn_sender,
};
use crate::state::AppState;

use super::messages::{MediaStreamIncoming, MediaStreamOutgoing, StreamStart};

type Outbound = RouteSender<MediaStreamOutgoing>;

/// Media stream WebSocket handler
///
/// Campaign parameters may arrive on the query string; custom parameters in
/// the `start` event take precedence.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<CampaignParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Media stream connection upgrade requested");
    let context = params.apply(state.config.campaign.context());

    ws.max_frame_size(MAX_WS_MESSAGE_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state, context))
}

/// Everything a spawned playback or turn task needs.
#[derive(Clone)]
struct Playback {
    engine: Arc<ConversationEngine>,
    registry: Arc<SessionRegistry>,
    outbound: Outbound,
    frame_bytes: usize,
    frame_interval: Duration,
    hangup_delay: Duration,
}

/// This connection's attachment to a call.
#[derive(Clone)]
struct Leg {
    session: SessionHandle,
    /// Outbound audio is tagged with the leg it is played on.
    stream_sid: String,
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>, context: CallContext) {
    info!("Media stream connection established");

    let (sink, mut stream) = socket.split();
    let (outbound, routes) =
        mpsc::channel::<MessageRoute<MediaStreamOutgoing>>(CHANNEL_BUFFER_SIZE);
    let sender_task = spawn_sender(sink, routes);

    let playback = Playback {
        engine: Arc::clone(&state.media_stream),
        registry: Arc::clone(&state.registry),
        outbound,
        frame_bytes: state.config.audio.frame_bytes,
        frame_interval: state.config.audio.frame_interval(),
        hangup_delay: state.config.calls.hangup_delay(),
    };
    let mut leg: Option<Leg> = None;
    let mut stopped = false;

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!("Media stream closed by provider");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Media stream socket error");
                break;
            }
        };

        let event = match serde_json::from_str::<MediaStreamIncoming>(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed media stream frame");
                continue;
            }
        };

        if !process_event(event, &mut leg, &context, &state, &playback) {
            stopped = true;
            break;
        }
    }

    if let Some(leg) = leg.take() {
        if stopped {
            // the provider ended the call itself
            state.registry.remove_session(&leg.session);
        } else {
            state.registry.release(&leg.session);
        }
    }
    // let queued frames drain; the sender exits once every route handle is gone
    drop(playback);
    let _ = sender_task.await;
    info!("Media stream connection finished");
}

/// Returns false when the connection should stop reading.
fn process_event(
    event: MediaStreamIncoming,
    leg: &mut Option<Leg>,
    context: &CallContext,
    state: &AppState,
    playback: &Playback,
) -> bool {
    match event {
        MediaStreamIncoming::Connected { protocol } => {
            debug!(protocol = ?protocol, "Media stream connected");
        }
        MediaStreamIncoming::Start { start, .. } => {
            if leg.is_some() {
                debug!(call_id = %start.call_sid, "Ignoring repeated start on the same stream");
                return true;
            }
            let (session, created) = start_session(&start, context, &state.registry);
            let attached = Leg {
                session,
                stream_sid: start.stream_sid,
            };
            if created {
                tokio::spawn(play_greeting(playback.clone(), attached.clone()));
            } else {
                info!(
                    call_id = %attached.session.call_id(),
                    "Duplicate start, keeping existing conversation"
                );
            }
            *leg = Some(attached);
        }
        MediaStreamIncoming::Media { media, .. } => {
            let Some(current) = leg.as_ref() else {
                debug!("Dropping media received before start");
                return true;
            };
            if !media.is_inbound() {
                return true;
            }
            let session = &current.session;
            match STANDARD.decode(media.payload.as_bytes()) {
                Ok(chunk) => session.push_audio(Bytes::from(chunk)),
                Err(e) => {
                    warn!(call_id = %session.call_id(), error = %e, "Invalid media payload");
                    return true;
                }
            }
            if let Some(batch) = playback.engine.begin_flush(session) {
                debug!(call_id = %session.call_id(), bytes = batch.len(), "Flushing caller audio");
                tokio::spawn(run_turn(playback.clone(), current.clone(), batch));
            }
        }
        MediaStreamIncoming::Mark { mark } => {
            debug!(mark = ?mark.map(|m| m.name), "Playback mark reached");
        }
        MediaStreamIncoming::Dtmf { dtmf } => {
            debug!(dtmf = ?dtmf, "DTMF received");
        }
        MediaStreamIncoming::Stop { .. } => {
            info!(
                call_id = ?leg.as_ref().map(|l| l.session.call_id().to_string()),
                "Media stream stopped"
            );
            return false;
        }
        MediaStreamIncoming::Unknown => {
            debug!("Ignoring unknown media stream event");
        }
    }
    true
}

fn start_session(
    start: &StreamStart,
    context: &CallContext,
    registry: &SessionRegistry,
) -> (SessionHandle, bool) {
    let call_id = if start.call_sid.is_empty() {
        start.stream_sid.as_str()
    } else {
        start.call_sid.as_str()
    };
    let context = start.custom_parameters.apply(context.clone());
    let (handle, created) = registry.attach(call_id, context);
    handle.set_stream_id(&start.stream_sid);
    info!(
        call_id = %call_id,
        stream_id = %start.stream_sid,
        brand = %handle.context().brand_name,
        "Media stream started"
    );
    (handle, created)
}

async fn play_greeting(playback: Playback, leg: Leg) {
    let session = &leg.session;
    if !session.try_mark_processing() {
        return;
    }
    if let Some(greeting) = playback.engine.greet(session).await
        && let Some(audio) = playback.engine.synthesize(session, &greeting).await
    {
        stream_audio(&playback, &leg, &audio, "greeting").await;
    }
    session.finish_processing();
}

async fn run_turn(playback: Playback, leg: Leg, batch: Bytes) {
    let session = &leg.session;
    let utterance = playback.engine.transcribe(session, &batch).await;
    if utterance.is_empty() {
        session.finish_processing();
        return;
    }
    info!(call_id = %session.call_id(), utterance = %utterance, "Caller said");

    let Some(result) = playback.engine.handle_utterance(session, &utterance, None).await else {
        session.finish_processing();
        return;
    };

    if let Some(audio) = playback.engine.synthesize(session, &result.response_text).await {
        stream_audio(&playback, &leg, &audio, "reply").await;
    }

    if result.should_end_call {
        info!(
            call_id = %session.call_id(),
            delay_ms = playback.hangup_delay.as_millis() as u64,
            "Scheduling hangup"
        );
        tokio::time::sleep(playback.hangup_delay).await;
        let _ = playback.outbound.send(MessageRoute::Close).await;
        playback.registry.remove_session(session);
    }
    session.finish_processing();
}

/// Send line audio as paced frames followed by a mark.
async fn stream_audio(playback: &Playback, leg: &Leg, ulaw: &[u8], label: &str) {
    let session = &leg.session;
    let stream_id = leg.stream_sid.as_str();
    if stream_id.is_empty() {
        warn!(call_id = %session.call_id(), "No stream id, cannot play audio");
        return;
    }

    let mut sent = 0usize;
    for frame in audio::frames(ulaw, playback.frame_bytes) {
        let message = MediaStreamOutgoing::media(stream_id, STANDARD.encode(frame));
        if playback.outbound.send(MessageRoute::Outgoing(message)).await.is_err() {
            debug!(call_id = %session.call_id(), "Socket gone, abandoning playback");
            return;
        }
        sent += 1;
        tokio::time::sleep(playback.frame_interval).await;
    }
    let _ = playback
        .outbound
        .send(MessageRoute::Outgoing(MediaStreamOutgoing::mark(stream_id, label)))
        .await;
    debug!(call_id = %session.call_id(), frames = sent, label, "Audio streamed");
}
