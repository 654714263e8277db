//! roomcast gateway library entry.
//!
//! This crate wires identity resolution, the room registry, the per-connection
//! dispatcher and keep-alive, and the backbone bridge into a WebSocket
//! gateway. It is consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod auth;
pub mod backbone;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;

pub use app_state::AppState;
pub use config::GatewayConfig;
