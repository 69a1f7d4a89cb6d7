//! Outbound side of a transport socket.
//!
//! Each connection splits its socket; the write half is owned by a sender
//! task fed through a bounded channel, so turn tasks can emit frames without
//! touching the socket directly.

use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Channel capacity per connection. Audio replies are sent frame by frame.
pub const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum inbound WebSocket frame and message size (1 MB)
pub const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
pub enum MessageRoute<T> {
    Outgoing(T),
    Close,
}

pub type RouteSender<T> = mpsc::Sender<MessageRoute<T>>;

/// Spawn the task that serializes routed messages onto the socket.
///
/// The task ends after a `Close` route, when the peer goes away, or when
/// every sender has been dropped.
pub fn spawn_sender<T>(
    mut sink: SplitSink<WebSocket, Message>,
    mut routes: mpsc::Receiver<MessageRoute<T>>,
) -> JoinHandle<()>
where
    T: Serialize + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(route) = routes.recv().await {
            let result = match route {
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json) => sink.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                MessageRoute::Close => {
                    debug!("Closing transport socket");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    })
}
