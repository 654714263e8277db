//! Frame codec: text frames carry JSON envelopes.
//!
//! - Text => Envelope
//! - Binary => read error (the protocol is text-only)
//! - Ping/Pong are answered by the transport; Close ends the session

use std::borrow::Cow;

use axum::extract::ws::{CloseFrame, Message};
use roomcast_core::{
    error::{Result, RoomcastError},
    protocol::Envelope,
};

#[derive(Debug)]
pub enum Inbound {
    Envelope(Envelope),
    Control,
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Envelope::from_json(&s)
            .map(Inbound::Envelope)
            .map_err(|e| RoomcastError::TransportRead(e.to_string())),
        Message::Binary(b) => Err(RoomcastError::TransportRead(format!(
            "unexpected binary frame ({} bytes)",
            b.len()
        ))),
        Message::Ping(_) | Message::Pong(_) => Ok(Inbound::Control),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    }))
}
