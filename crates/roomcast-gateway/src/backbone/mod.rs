//! Publish/subscribe backbone.
//!
//! `Backbone` is the seam to the external messaging system; `NatsBackbone`
//! is the production implementation and `BackboneBridge` connects it to the
//! room registry.

pub mod bridge;
pub mod nats;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use roomcast_core::error::Result;

use crate::config::BackboneSection;

pub use bridge::BackboneBridge;
pub use nats::NatsBackbone;

/// One message received on a subscription.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub subject: String,
    pub payload: Bytes,
}

#[async_trait]
pub trait Backbone: Send + Sync {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;

    /// Subscribe to a wildcard pattern. The stream ends when the
    /// subscription is closed by the backbone.
    async fn subscribe(&self, pattern: &str) -> Result<BoxStream<'static, InboundMessage>>;
}

/// Connect to the configured backbone, if any.
///
/// A disabled or unreachable backbone yields `None`: the gateway keeps
/// serving clients without publish or inbound fanout.
pub async fn connect(cfg: &BackboneSection) -> Option<Arc<dyn Backbone>> {
    if !cfg.enabled() {
        tracing::info!("backbone disabled; running local-only");
        return None;
    }
    match NatsBackbone::connect(cfg).await {
        Ok(nats) => Some(Arc::new(nats)),
        Err(e) => {
            tracing::warn!(error = %e, "backbone unavailable; running local-only");
            None
        }
    }
}
