//! roomcast core: transport-agnostic protocol primitives, error types, and
//! the reconnect backoff policy.
//!
//! This crate defines the envelope contract shared by clients and the
//! publish/subscribe backbone, the topic naming scheme, and the error surface
//! used by the gateway. It carries no transport or runtime dependencies so it
//! can be reused by producers that publish into rooms.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `RoomcastError`/`Result` so a malformed
//! envelope can never take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod backoff;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, RoomcastError};
