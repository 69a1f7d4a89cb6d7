//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use leadcall_gateway::core::dialogue::PolicyKind;
use leadcall_gateway::core::session::{CallContext, SessionRegistry};
use leadcall_gateway::core::stt::{STTError, SpeechToText, Transcriber};
use leadcall_gateway::core::tts::{
    AudioEncoding, SpeechSynthesizer, SynthesizedAudio, TTSResult, TextToSpeech,
};
use leadcall_gateway::{AppState, ServerConfig, routes};

/// Scripted everywhere, short delays, no credentials.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.dialogue.media_stream_policy = PolicyKind::Scripted;
    config.dialogue.relay_policy = PolicyKind::Scripted;
    config.calls.hangup_delay_ms = 50;
    config.calls.end_grace_secs = 0;
    config.audio.frame_interval_ms = 1;
    config
}

pub fn acme() -> CallContext {
    CallContext {
        business_name: "Acme".to_string(),
        product_category: "Widgets".to_string(),
        brand_name: "Acme Co".to_string(),
    }
}

/// Serve `state` on an ephemeral port.
pub async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::voice::app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (socket, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("socket connection");
    socket
}

pub async fn send(socket: &mut Client, value: Value) {
    socket
        .send(Message::text(value.to_string()))
        .await
        .expect("send frame");
}

/// Next JSON message, or `None` if the socket closed or stayed quiet.
pub async fn next_json(socket: &mut Client) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .ok()??
            .ok()?;
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Poll until `call_id` leaves the registry or `within` elapses.
pub async fn wait_for_removal(registry: &SessionRegistry, call_id: &str, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if !registry.contains(call_id) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    !registry.contains(call_id)
}

/// Returns queued transcripts in order, then empty strings.
pub struct QueuedTranscriber {
    transcripts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl QueuedTranscriber {
    pub fn new(transcripts: &[&str]) -> Self {
        let mut queued: Vec<String> = transcripts.iter().map(|t| t.to_string()).collect();
        queued.reverse();
        Self {
            transcripts: Mutex::new(queued),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for QueuedTranscriber {
    async fn transcribe(&self, wav: Bytes) -> Result<String, STTError> {
        assert!(wav.starts_with(b"RIFF"), "transcriber expects a WAV payload");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcripts.lock().pop().unwrap_or_default())
    }

    fn provider_name(&self) -> &'static str {
        "queued"
    }
}

/// Synthesizes every line as a fixed run of line-ready mu-law silence.
pub struct SilenceSynthesizer {
    pub bytes: usize,
    pub lines: Mutex<Vec<String>>,
}

impl SilenceSynthesizer {
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes,
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for SilenceSynthesizer {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio> {
        self.lines.lock().push(text.to_string());
        Ok(SynthesizedAudio {
            data: Bytes::from(vec![0xFF; self.bytes]),
            encoding: AudioEncoding::Ulaw8000,
        })
    }

    fn provider_name(&self) -> &'static str {
        "silence"
    }
}

pub fn speech(
    transcriber: Arc<QueuedTranscriber>,
    synthesizer: Arc<SilenceSynthesizer>,
) -> (SpeechToText, TextToSpeech) {
    let timeout = Duration::from_secs(5);
    (
        SpeechToText::new(transcriber, timeout),
        TextToSpeech::new(synthesizer, timeout),
    )
}
