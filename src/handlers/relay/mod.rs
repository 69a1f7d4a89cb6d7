//! Text relay transport bridge
//!
//! The provider runs speech recognition and synthesis itself and exchanges
//! plain text with us over the `conversation-relay.v1` subprotocol.
//!
//! ## Provider → Server
//!
//! - **setup**: call id and custom parameters
//! - **prompt**: a transcribed caller utterance
//! - **interrupt**, **dtmf**, **error**: advisory
//!
//! ## Server → Provider
//!
//! - **text**: one complete utterance to speak
//! - **end**: hang up the call

mod handler;
pub mod messages;

pub use handler::{RELAY_SUBPROTOCOL, relay_handler};
