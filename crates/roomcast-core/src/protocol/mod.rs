//! Protocol modules (envelope + backbone topics).
//!
//! - `envelope`: the JSON message shape exchanged with clients and the backbone.
//! - `topic`: subject naming for outbound actions and inbound updates.
//!
//! Decoding never panics: malformed input is reported as `RoomcastError`.

pub mod envelope;
pub mod topic;

pub use envelope::{new_id, Envelope, MsgKind};
