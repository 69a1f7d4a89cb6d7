use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::session::{CallContext, SessionHandle};
use crate::handlers::CampaignParams;
use crate::handlers::socket::{
    CHANNEL_BUFFER_SIZE, MAX_WS_MESSAGE_SIZE, MessageRoute, RouteSender, spawn_sender,
};
use crate::state::AppState;

use super::messages::{RelayIncoming, RelayOutgoing};

pub const RELAY_SUBPROTOCOL: &str = "conversation-relay.v1";

/// Text relay WebSocket handler
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<CampaignParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Relay connection upgrade requested");
    let context = params.apply(state.config.campaign.context());

    ws.protocols([RELAY_SUBPROTOCOL])
        .max_frame_size(MAX_WS_MESSAGE_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state, context))
}

struct RelayConnection {
    state: Arc<AppState>,
    context: CallContext,
    outbound: RouteSender<RelayOutgoing>,
    session: Option<SessionHandle>,
    /// The session was created under a placeholder id by a prompt that beat
    /// setup, and still waits for its real call id.
    placeholder: bool,
}

async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>, context: CallContext) {
    info!("Relay connection established");

    let (sink, mut stream) = socket.split();
    let (outbound, routes) = mpsc::channel::<MessageRoute<RelayOutgoing>>(CHANNEL_BUFFER_SIZE);
    let sender_task = spawn_sender(sink, routes);

    let mut connection = RelayConnection {
        state,
        context,
        outbound,
        session: None,
        placeholder: false,
    };

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!("Relay closed by provider");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Relay socket error");
                break;
            }
        };

        match serde_json::from_str::<RelayIncoming>(text.as_str()) {
            Ok(message) => connection.process(message).await,
            Err(e) => warn!(error = %e, "Ignoring malformed relay message"),
        }
    }

    if let Some(session) = connection.session.take() {
        connection.state.registry.release(&session);
    }
    drop(connection);
    let _ = sender_task.await;
    info!("Relay connection finished");
}

impl RelayConnection {
    async fn process(&mut self, message: RelayIncoming) {
        match message {
            RelayIncoming::Setup {
                session_id,
                call_sid,
                custom_parameters,
            } => {
                let call_id = call_sid.or(session_id).filter(|id| !id.is_empty());
                let context = custom_parameters.apply(self.context.clone());
                match self.session.take() {
                    Some(placeholder) if self.placeholder => {
                        self.adopt(placeholder, call_id, context).await;
                    }
                    Some(session) => {
                        debug!("Ignoring repeated setup on the same connection");
                        self.session = Some(session);
                    }
                    None => {
                        let call_id = call_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                        self.setup(&call_id, context).await;
                    }
                }
            }
            RelayIncoming::Prompt {
                voice_prompt,
                confidence,
                last,
            } => {
                if last == Some(false) {
                    return;
                }
                let session = self.session_or_create();
                let Some(result) = self
                    .state
                    .relay
                    .handle_utterance(&session, &voice_prompt, confidence)
                    .await
                else {
                    return;
                };

                self.send(RelayOutgoing::utterance(result.response_text)).await;
                if result.should_end_call {
                    self.schedule_end(session);
                }
            }
            RelayIncoming::Interrupt {
                utterance_until_interrupt,
            } => {
                debug!(spoken = ?utterance_until_interrupt, "Caller interrupted playback");
            }
            RelayIncoming::Dtmf { digit } => {
                debug!(digit = ?digit, "DTMF received");
            }
            RelayIncoming::Error { description } => {
                warn!(description = ?description, "Relay reported an error");
            }
            RelayIncoming::Unknown => {
                debug!("Ignoring unknown relay message");
            }
        }
    }

    async fn setup(&mut self, call_id: &str, context: CallContext) {
        let (session, created) = self.state.registry.attach(call_id, context);
        info!(
            call_id = %call_id,
            brand = %session.context().brand_name,
            created,
            "Relay setup"
        );
        self.session = Some(Arc::clone(&session));
        if created && let Some(greeting) = self.state.relay.greet(&session).await {
            self.send(RelayOutgoing::utterance(greeting)).await;
        }
    }

    /// Move an early session under the call id that setup finally supplied.
    async fn adopt(
        &mut self,
        placeholder: SessionHandle,
        call_id: Option<String>,
        context: CallContext,
    ) {
        self.placeholder = false;
        let Some(call_id) = call_id else {
            debug!(call_id = %placeholder.call_id(), "Setup without a call id, keeping session");
            self.session = Some(placeholder);
            return;
        };

        let (session, created) = self.state.registry.attach(&call_id, context);
        if created {
            session.adopt_conversation(&placeholder).await;
            info!(
                placeholder = %placeholder.call_id(),
                call_id = %call_id,
                brand = %session.context().brand_name,
                "Early session re-keyed under its call id"
            );
        } else {
            info!(call_id = %call_id, "Setup for a known call, dropping early session");
        }
        self.state.registry.release(&placeholder);
        self.session = Some(Arc::clone(&session));

        // only greets when the early prompts left nothing in the history
        if created && let Some(greeting) = self.state.relay.greet(&session).await {
            self.send(RelayOutgoing::utterance(greeting)).await;
        }
    }

    /// A prompt can arrive before setup; build a minimal session for it.
    fn session_or_create(&mut self) -> SessionHandle {
        if let Some(session) = &self.session {
            return Arc::clone(session);
        }
        let call_id = uuid::Uuid::new_v4().to_string();
        warn!(call_id = %call_id, "Prompt before setup, creating session");
        let (session, _) = self.state.registry.attach(&call_id, self.context.clone());
        self.session = Some(Arc::clone(&session));
        self.placeholder = true;
        session
    }

    async fn send(&self, message: RelayOutgoing) {
        if self.outbound.send(MessageRoute::Outgoing(message)).await.is_err() {
            debug!("Relay socket gone, dropping message");
        }
    }

    /// End the call once the last reply has had time to play.
    fn schedule_end(&self, session: SessionHandle) {
        let outbound = self.outbound.clone();
        let registry = Arc::clone(&self.state.registry);
        let delay = self.state.config.calls.hangup_delay();
        info!(
            call_id = %session.call_id(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling hangup"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = outbound.send(MessageRoute::Outgoing(RelayOutgoing::End)).await;
            registry.remove_session(&session);
        });
    }
}
