//! roomcast: room-scoped realtime gateway over WebSocket with a pub/sub backbone.
//!
//! Depend on this crate to get the envelope protocol and the embeddable
//! gateway in one place:
//!
//! ```no_run
//! use roomcast::prelude::*;
//!
//! # async fn run() -> roomcast::Result<()> {
//! let cfg = roomcast::gateway::config::load()?;
//! let backbone = roomcast::gateway::backbone::connect(&cfg.backbone).await;
//! let state = AppState::new(cfg, backbone)?;
//! let app = roomcast::gateway::router::build_router(state);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod core {
    pub use roomcast_core::*;
}

pub mod gateway {
    pub use roomcast_gateway::*;
}

pub use roomcast_core::{Result, RoomcastError};

/// Types most embedders need.
pub mod prelude {
    pub use roomcast_core::protocol::{Envelope, MsgKind};
    pub use roomcast_core::{Result, RoomcastError};
    pub use roomcast_gateway::backbone::Backbone;
    pub use roomcast_gateway::{AppState, GatewayConfig};
}
