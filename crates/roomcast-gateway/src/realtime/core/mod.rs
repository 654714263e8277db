//! Realtime core components for the gateway runtime.
//!
//! Connections and the room registry that fanout reads from.

mod connection;
mod room_registry;

pub use connection::Connection;
pub use room_registry::RoomRegistry;
