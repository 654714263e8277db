//! Shared error type across roomcast crates.

use thiserror::Error;

/// Stable error codes (logs, metrics labels, HTTP bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message or config.
    BadRequest,
    /// Credential missing, malformed or rejected.
    AuthFailed,
    /// Reading from a client channel failed.
    TransportRead,
    /// Writing to a client channel failed.
    TransportWrite,
    /// The backbone rejected or could not take a publish.
    BackbonePublish,
    /// The backbone subscription could not be established.
    BackboneSubscribe,
    /// Inbound backbone message with a bad subject or payload.
    MalformedBackboneMessage,
    /// Unsupported config schema version.
    UnsupportedVersion,
    /// A bounded operation ran out of time.
    Timeout,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::TransportRead => "TRANSPORT_READ",
            ClientCode::TransportWrite => "TRANSPORT_WRITE",
            ClientCode::BackbonePublish => "BACKBONE_PUBLISH",
            ClientCode::BackboneSubscribe => "BACKBONE_SUBSCRIBE",
            ClientCode::MalformedBackboneMessage => "MALFORMED_BACKBONE_MESSAGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RoomcastError>;

/// Unified error type used by core and gateway.
///
/// None of these are process-fatal except `Internal` raised while binding
/// the listener at startup.
#[derive(Debug, Error)]
pub enum RoomcastError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed: {0}")]
    AuthFailed(String),
    #[error("transport read: {0}")]
    TransportRead(String),
    #[error("transport write: {0}")]
    TransportWrite(String),
    #[error("backbone publish: {0}")]
    BackbonePublish(String),
    #[error("backbone subscribe: {0}")]
    BackboneSubscribe(String),
    #[error("malformed backbone message: {0}")]
    MalformedBackboneMessage(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("timed out")]
    Timeout,
    #[error("internal: {0}")]
    Internal(String),
}

impl RoomcastError {
    /// Map internal error to a stable code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RoomcastError::BadRequest(_) => ClientCode::BadRequest,
            RoomcastError::AuthFailed(_) => ClientCode::AuthFailed,
            RoomcastError::TransportRead(_) => ClientCode::TransportRead,
            RoomcastError::TransportWrite(_) => ClientCode::TransportWrite,
            RoomcastError::BackbonePublish(_) => ClientCode::BackbonePublish,
            RoomcastError::BackboneSubscribe(_) => ClientCode::BackboneSubscribe,
            RoomcastError::MalformedBackboneMessage(_) => ClientCode::MalformedBackboneMessage,
            RoomcastError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RoomcastError::Timeout => ClientCode::Timeout,
            RoomcastError::Internal(_) => ClientCode::Internal,
        }
    }
}
