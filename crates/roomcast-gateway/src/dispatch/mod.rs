//! Dispatcher module exports.
//!
//! The dispatcher owns the per-connection read loop and routes envelopes by
//! type to the room registry or the backbone bridge.

pub mod dispatcher;

pub use dispatcher::Dispatcher;
