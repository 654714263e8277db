//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler, the codec that turns frames into
//! envelopes, and the per-connection session tasks (writer, keep-alive).

pub mod codec;
pub mod keepalive;
pub mod session;
pub mod ws;
