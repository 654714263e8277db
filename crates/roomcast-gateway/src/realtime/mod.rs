//! Realtime runtime for the gateway: connections, room membership, and
//! delivery primitives shared by the dispatcher and the backbone bridge.

pub mod core;
pub mod types;

pub use core::{Connection, RoomRegistry};
pub use types::{Delivery, PreparedMsg};
