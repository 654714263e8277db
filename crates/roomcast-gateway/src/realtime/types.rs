use std::time::Duration;

use axum::extract::ws::Message;

use roomcast_core::error::Result;
use roomcast_core::protocol::Envelope;

/// How long a send to one connection may wait on its outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Client-originated replies and keep-alives: wait for queue space.
    #[default]
    Unbounded,
    /// Fanout: give up on this peer after `timeout`.
    Bounded { timeout: Duration },
}

/// Envelope serialized once, sent N times.
#[derive(Debug, Clone)]
pub struct PreparedMsg(String);

impl PreparedMsg {
    pub fn from_envelope(env: &Envelope) -> Result<Self> {
        env.to_json().map(PreparedMsg)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to axum::ws::Message for transport.
    pub fn to_ws_message(&self) -> Message {
        Message::Text(self.0.clone())
    }
}
