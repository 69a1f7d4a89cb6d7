//! Media stream transport bridge
//!
//! The provider streams the caller's audio as base64 mu-law frames and plays
//! back whatever frames are sent on the same socket.
//!
//! ## Provider → Server
//!
//! - **connected**: socket is up, nothing to do yet
//! - **start**: call and stream ids plus custom parameters
//! - **media**: 20 ms of caller audio
//! - **mark**, **dtmf**: advisory
//! - **stop**: the call is over
//!
//! ## Server → Provider
//!
//! - **media**: one frame of synthesized reply audio
//! - **mark**: emitted after a reply finished streaming

mod handler;
pub mod messages;

pub use handler::media_stream_handler;
