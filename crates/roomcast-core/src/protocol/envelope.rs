//! Envelope (JSON), the unit of exchange on both sides of the gateway.
//!
//! `payload` is kept as `RawValue`: the gateway routes it, never interprets it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

use crate::error::{Result, RoomcastError};

/// Protocol version stamped on everything the gateway emits.
pub const PROTOCOL_VERSION: u32 = 1;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 16;

/// Generate a random 16-character `[a-z0-9]` identifier.
pub fn new_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}

/// Message kind parsed from the open `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgKind {
    Ping,
    Pong,
    Subscribe,
    Subscribed,
    Action,
    Update,
    /// Unrecognized types are tolerated and ignored.
    Other(String),
}

impl MsgKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "ping" => MsgKind::Ping,
            "pong" => MsgKind::Pong,
            "subscribe" => MsgKind::Subscribe,
            "subscribed" => MsgKind::Subscribed,
            "action" => MsgKind::Action,
            "update" => MsgKind::Update,
            other => MsgKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MsgKind::Ping => "ping",
            MsgKind::Pong => "pong",
            MsgKind::Subscribe => "subscribe",
            MsgKind::Subscribed => "subscribed",
            MsgKind::Action => "action",
            MsgKind::Update => "update",
            MsgKind::Other(s) => s,
        }
    }

    /// Bounded label for metrics: unknown types collapse into `other`.
    pub fn label(&self) -> &'static str {
        match self {
            MsgKind::Ping => "ping",
            MsgKind::Pong => "pong",
            MsgKind::Subscribe => "subscribe",
            MsgKind::Subscribed => "subscribed",
            MsgKind::Action => "action",
            MsgKind::Update => "update",
            MsgKind::Other(_) => "other",
        }
    }
}

/// `null` reads as the field's zero value, same as an absent field.
fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, str::is_empty)
}

/// Wire envelope: `{v, type, room?, from?, id, ts, payload}`.
///
/// Every field is optional on input; `normalize` (client traffic) or
/// `restamp` (backbone traffic) fills what the producer left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version (0 means absent).
    #[serde(default, deserialize_with = "null_as_default")]
    pub v: u32,
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub msg_type: String,
    /// Target room.
    #[serde(default, skip_serializing_if = "is_blank")]
    pub room: Option<String>,
    /// Sender identity.
    #[serde(default, skip_serializing_if = "is_blank")]
    pub from: Option<String>,
    /// Message id, unique per message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
    /// Opaque, type-specific payload.
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

impl Envelope {
    fn server(kind: MsgKind, id: String) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            msg_type: kind.as_str().to_string(),
            id,
            ts: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// `pong` reply carrying the ping's id.
    pub fn pong(id: impl Into<String>) -> Self {
        Self::server(MsgKind::Pong, id.into())
    }

    /// `subscribed` ack echoing room and id.
    pub fn subscribed(room: impl Into<String>, id: impl Into<String>) -> Self {
        let mut env = Self::server(MsgKind::Subscribed, id.into());
        env.room = Some(room.into());
        env
    }

    /// Keep-alive `ping` with a fresh id.
    pub fn ping() -> Self {
        Self::server(MsgKind::Ping, new_id())
    }

    pub fn kind(&self) -> MsgKind {
        MsgKind::parse(&self.msg_type)
    }

    /// Room name if present and non-empty.
    pub fn room_name(&self) -> Option<&str> {
        self.room.as_deref().filter(|r| !r.is_empty())
    }

    /// Fill absent version, id and timestamp. Supplied values are kept.
    pub fn normalize(&mut self) {
        if self.v == 0 {
            self.v = PROTOCOL_VERSION;
        }
        if self.id.is_empty() {
            self.id = new_id();
        }
        if self.ts.is_none() {
            self.ts = Some(Utc::now());
        }
    }

    /// Re-stamp a backbone-originated envelope: version and timestamp are
    /// overwritten, a missing id is generated.
    pub fn restamp(&mut self) {
        self.v = PROTOCOL_VERSION;
        self.ts = Some(Utc::now());
        if self.id.is_empty() {
            self.id = new_id();
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| RoomcastError::BadRequest(format!("invalid envelope json: {e}")))
    }

    pub fn from_slice(b: &[u8]) -> Result<Self> {
        serde_json::from_slice(b)
            .map_err(|e| RoomcastError::BadRequest(format!("invalid envelope json: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RoomcastError::Internal(format!("envelope encode failed: {e}")))
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        self.to_json().map(Bytes::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_lowercase_alphanumeric() {
        let id = new_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn unknown_kinds_collapse_in_labels() {
        assert_eq!(MsgKind::parse("presence"), MsgKind::Other("presence".into()));
        assert_eq!(MsgKind::parse("presence").label(), "other");
        assert_eq!(MsgKind::parse("action").label(), "action");
    }
}
