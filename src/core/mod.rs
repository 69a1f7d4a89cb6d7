pub mod audio;
pub mod dialogue;
pub mod engine;
pub mod llm;
pub mod session;
pub mod stt;
pub mod telephony;
pub mod tts;
pub mod twiml;

// Re-export commonly used types for convenience
pub use dialogue::{DialoguePolicy, GenerativePolicy, PolicyKind, ScriptedPolicy, Stage, TurnResult};
pub use engine::{ConversationEngine, EngineSettings};
pub use llm::{ChatCompletion, ChatMessage, LLMError, OpenAIChat};
pub use session::{CallContext, CallSession, Conversation, SessionHandle, SessionRegistry};
pub use stt::{STTError, SpeechToText, Transcriber, WhisperTranscriber};
pub use telephony::{
    CallMode, CallRecord, CallStatus, OutboundCall, TelephonyClient, TelephonyError, TwilioClient,
};
pub use tts::{ElevenLabsTTS, SpeechSynthesizer, TTSError, TextToSpeech};
