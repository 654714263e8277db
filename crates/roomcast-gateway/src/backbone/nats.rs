//! NATS implementation of [`Backbone`] (core pub/sub, no JetStream).

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use roomcast_core::backoff;
use roomcast_core::error::{Result, RoomcastError};

use super::{Backbone, InboundMessage};
use crate::config::BackboneSection;

#[derive(Clone)]
pub struct NatsBackbone {
    client: Client,
}

impl NatsBackbone {
    /// Connect, retrying up to `connect_attempts` times with backoff.
    /// Once connected, the client's own reconnects use the same backoff.
    pub async fn connect(cfg: &BackboneSection) -> Result<Self> {
        let mut attempt: u32 = 0;
        loop {
            let opts = ConnectOptions::new()
                .name(&cfg.name)
                .reconnect_delay_callback(|attempts| {
                    backoff::delay(u32::try_from(attempts).unwrap_or(u32::MAX))
                });

            match opts.connect(cfg.url.as_str()).await {
                Ok(client) => {
                    tracing::info!(url = %cfg.url, attempt, "connected to backbone");
                    return Ok(Self { client });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= cfg.connect_attempts {
                        return Err(RoomcastError::Internal(format!(
                            "backbone connect failed after {attempt} attempts: {e}"
                        )));
                    }
                    let wait = backoff::delay(attempt - 1);
                    tracing::warn!(url = %cfg.url, attempt, ?wait, error = %e, "backbone connect failed; retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[async_trait]
impl Backbone for NatsBackbone {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject, payload)
            .await
            .map_err(|e| RoomcastError::BackbonePublish(e.to_string()))
    }

    async fn subscribe(&self, pattern: &str) -> Result<BoxStream<'static, InboundMessage>> {
        let sub = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(|e| RoomcastError::BackboneSubscribe(e.to_string()))?;

        Ok(sub
            .map(|m| InboundMessage {
                subject: m.subject.to_string(),
                payload: m.payload,
            })
            .boxed())
    }
}
