//! Backbone bridge: client actions out, room updates in.
//!
//! Outbound: `action` envelopes are published on `room.<room>.action`.
//! Inbound: one shared subscription on `room.*.update`; each message is
//! re-stamped and fanned out to the room's current members by the worker
//! that owns the room. Every peer send is bounded on its own, so one stalled
//! client cannot hold up the rest.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use roomcast_core::error::RoomcastError;
use roomcast_core::protocol::{topic, Envelope};

use super::{Backbone, InboundMessage};
use crate::obs::GatewayMetrics;
use crate::realtime::{Delivery, PreparedMsg, RoomRegistry};

/// Number of fanout workers.
pub const FANOUT_SHARDS: usize = 16;
const SHARD_QUEUE: usize = 256;

/// Worker index for an update subject. Subjects of one room always map to
/// the same worker.
pub fn fanout_shard(subject: &str) -> usize {
    let key = topic::room_from_subject(subject).unwrap_or(subject);
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    (h.finish() % FANOUT_SHARDS as u64) as usize
}

pub struct BackboneBridge {
    backbone: Option<Arc<dyn Backbone>>,
    registry: Arc<RoomRegistry>,
    delivery: Delivery,
    metrics: Arc<GatewayMetrics>,
}

impl BackboneBridge {
    pub fn new(
        backbone: Option<Arc<dyn Backbone>>,
        registry: Arc<RoomRegistry>,
        fanout_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            backbone,
            registry,
            delivery: Delivery::Bounded { timeout: fanout_timeout },
            metrics,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backbone.is_some()
    }

    /// Publish a client action. Without a backbone this is a silent no-op;
    /// backbone errors are logged and swallowed.
    pub async fn publish_action(&self, env: &Envelope) {
        let Some(backbone) = &self.backbone else {
            return;
        };
        let Some(room) = env.room_name() else {
            tracing::debug!(id = %env.id, "action without room dropped");
            self.metrics.backbone_publish.inc(&[("result", "skipped")]);
            return;
        };

        let payload = match env.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%room, error = %e, "action encode failed");
                self.metrics.backbone_publish.inc(&[("result", "error")]);
                return;
            }
        };

        match backbone.publish(topic::action_subject(room), payload).await {
            Ok(()) => self.metrics.backbone_publish.inc(&[("result", "ok")]),
            Err(e) => {
                tracing::warn!(%room, error = %e, "backbone publish failed");
                self.metrics.backbone_publish.inc(&[("result", "error")]);
            }
        }
    }

    /// Subscribe once to room updates and run fanout until `shutdown`.
    ///
    /// Messages are routed to [`FANOUT_SHARDS`] workers by room, so updates
    /// to one room stay in order while a stalled room only delays the rooms
    /// sharing its worker. Returns `None` when there is no backbone or the
    /// subscription fails; the gateway then runs without inbound fanout.
    pub async fn start_fanout(self: &Arc<Self>, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let backbone = self.backbone.as_ref()?;
        let mut updates = match backbone.subscribe(topic::UPDATE_PATTERN).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(pattern = topic::UPDATE_PATTERN, error = %e, "backbone subscribe failed; inbound fanout disabled");
                return None;
            }
        };
        tracing::info!(pattern = topic::UPDATE_PATTERN, "subscribed to room updates");

        let mut shards = Vec::with_capacity(FANOUT_SHARDS);
        let mut workers = Vec::with_capacity(FANOUT_SHARDS);
        for _ in 0..FANOUT_SHARDS {
            let (tx, rx) = mpsc::channel(SHARD_QUEUE);
            shards.push(tx);
            workers.push(tokio::spawn(
                Arc::clone(self).run_shard(rx, shutdown.clone()).in_current_span(),
            ));
        }

        Some(tokio::spawn(
            async move {
                loop {
                    let msg = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        next = updates.next() => match next {
                            Some(msg) => msg,
                            None => {
                                tracing::warn!("room update subscription closed");
                                break;
                            }
                        },
                    };
                    let shard = &shards[fanout_shard(&msg.subject)];
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        res = shard.send(msg) => {
                            if res.is_err() {
                                break;
                            }
                        }
                    }
                }
                drop(shards);
                for worker in workers {
                    let _ = worker.await;
                }
            }
            .in_current_span(),
        ))
    }

    async fn run_shard(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>, shutdown: CancellationToken) {
        loop {
            let msg = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = rx.recv() => match next {
                    Some(msg) => msg,
                    None => break,
                },
            };
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.deliver(&msg.subject, &msg.payload) => {}
            }
        }
    }

    /// Handle one inbound backbone message. Returns the number of members
    /// the envelope was delivered to; malformed messages deliver to nobody.
    pub async fn deliver(&self, subject: &str, payload: &[u8]) -> usize {
        let Some(room) = topic::room_from_subject(subject) else {
            tracing::debug!(%subject, "malformed update subject dropped");
            self.metrics.backbone_dropped.inc(&[("reason", "subject")]);
            return 0;
        };

        let mut env = match Envelope::from_slice(payload) {
            Ok(env) => env,
            Err(e) => {
                let e = RoomcastError::MalformedBackboneMessage(e.to_string());
                tracing::debug!(%subject, error = %e, "update dropped");
                self.metrics.backbone_dropped.inc(&[("reason", "payload")]);
                return 0;
            }
        };
        env.restamp();

        self.fanout(room, &env).await
    }

    /// Send `env` to every current member of `room`, best-effort.
    pub async fn fanout(&self, room: &str, env: &Envelope) -> usize {
        let peers = self.registry.snapshot(room);
        if peers.is_empty() {
            return 0;
        }

        let prepared = match PreparedMsg::from_envelope(env) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%room, error = %e, "update encode failed");
                return 0;
            }
        };

        let prepared = &prepared;
        let delivery = self.delivery;
        let mut sends: FuturesUnordered<_> = peers
            .iter()
            .map(|peer| async move { (peer, peer.send_prepared(prepared, delivery).await) })
            .collect();

        let mut delivered = 0;
        while let Some((peer, res)) = sends.next().await {
            match res {
                Ok(()) => {
                    delivered += 1;
                    self.metrics.fanout_sends.inc(&[("result", "delivered")]);
                }
                Err(RoomcastError::Timeout) => {
                    tracing::debug!(%room, cid = %peer.id(), "fanout send timed out");
                    self.metrics.fanout_sends.inc(&[("result", "timeout")]);
                }
                Err(e) => {
                    tracing::debug!(%room, cid = %peer.id(), error = %e, "fanout send failed");
                    self.metrics.fanout_sends.inc(&[("result", "closed")]);
                }
            }
        }
        delivered
    }
}
