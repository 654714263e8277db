#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use tokio::sync::mpsc;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::Envelope;
use roomcast_gateway::backbone::{Backbone, InboundMessage};
use roomcast_gateway::{AppState, GatewayConfig};

/// In-memory backbone: records publishes, feeds one subscription from a channel.
pub struct MemoryBackbone {
    published: Mutex<Vec<(String, Bytes)>>,
    feed: mpsc::UnboundedSender<InboundMessage>,
    updates: Mutex<Option<mpsc::UnboundedReceiver<InboundMessage>>>,
    fail_publish: bool,
}

impl MemoryBackbone {
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(true)
    }

    fn build(fail_publish: bool) -> Arc<Self> {
        let (feed, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
            feed,
            updates: Mutex::new(Some(rx)),
            fail_publish,
        })
    }

    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.published.lock().unwrap().clone()
    }

    /// Inject a message as if a producer published it.
    pub fn push(&self, subject: &str, payload: &str) {
        self.feed
            .send(InboundMessage {
                subject: subject.to_string(),
                payload: Bytes::from(payload.to_string()),
            })
            .unwrap();
    }
}

#[async_trait]
impl Backbone for MemoryBackbone {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        if self.fail_publish {
            return Err(RoomcastError::BackbonePublish("backbone down".into()));
        }
        self.published.lock().unwrap().push((subject, payload));
        Ok(())
    }

    async fn subscribe(&self, _pattern: &str) -> Result<BoxStream<'static, InboundMessage>> {
        let rx = self
            .updates
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| RoomcastError::BackboneSubscribe("already subscribed".into()))?;
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|m| (m, rx)) }).boxed())
    }
}

pub fn test_config() -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.gateway.fanout_timeout_ms = 100;
    cfg.gateway.outbound_queue = 16;
    cfg
}

pub fn state_with(backbone: Option<Arc<MemoryBackbone>>) -> AppState {
    AppState::new(test_config(), backbone.map(|b| b as Arc<dyn Backbone>)).unwrap()
}

pub fn state_with_secret(secret: &str) -> AppState {
    let mut cfg = test_config();
    cfg.auth.jwt_secret = secret.to_string();
    AppState::new(cfg, None).unwrap()
}

/// Client side of a session: frames pushed into `tx` arrive as the inbound stream.
pub fn client_stream() -> (
    mpsc::UnboundedSender<Message>,
    impl Stream<Item = std::result::Result<Message, Infallible>> + Send,
) {
    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    let inbound = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|m| (Ok::<_, Infallible>(m), rx))
    });
    (tx, inbound)
}

pub fn text(json: &str) -> Message {
    Message::Text(json.to_string())
}

/// Next text frame from an outbound queue, decoded.
pub async fn recv_env(rx: &mut mpsc::Receiver<Message>) -> Envelope {
    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("outbound closed");
    match msg {
        Message::Text(s) => Envelope::from_json(&s).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}
