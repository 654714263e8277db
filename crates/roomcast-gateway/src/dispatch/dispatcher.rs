use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};

use roomcast_core::error::Result;
use roomcast_core::protocol::{Envelope, MsgKind};

use crate::backbone::BackboneBridge;
use crate::obs::GatewayMetrics;
use crate::realtime::{Connection, RoomRegistry};
use crate::transport::codec::{decode, Inbound};

/// Routes client envelopes:
/// - `ping` => `pong` with the same id
/// - `subscribe` (non-empty room) => join + `subscribed` ack
/// - `action` => backbone publish
/// - anything else => ignored
pub struct Dispatcher {
    registry: Arc<RoomRegistry>,
    bridge: Arc<BackboneBridge>,
    metrics: Arc<GatewayMetrics>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<RoomRegistry>,
        bridge: Arc<BackboneBridge>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            registry,
            bridge,
            metrics,
        }
    }

    /// Read loop. Returns on read error, malformed frame, close frame,
    /// end of stream, or cancellation of the connection's scope. Membership
    /// cleanup is the caller's job.
    pub async fn run<S, E>(&self, conn: &Arc<Connection>, inbound: S)
    where
        S: Stream<Item = std::result::Result<Message, E>>,
        E: Display,
    {
        tokio::pin!(inbound);
        let cancel = conn.cancel_token().clone();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("read loop cancelled");
                    break;
                }
                next = inbound.next() => next,
            };

            let msg = match next {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "read error");
                    break;
                }
                None => {
                    tracing::debug!("channel closed by peer");
                    break;
                }
            };

            let env = match decode(msg) {
                Ok(Inbound::Envelope(env)) => env,
                Ok(Inbound::Control) => continue,
                Ok(Inbound::Close) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "read error");
                    break;
                }
            };

            // A reply can wait on a full outbound queue; cancellation still wins.
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("read loop cancelled");
                    break;
                }
                res = self.dispatch(conn, env) => {
                    if let Err(e) = res {
                        tracing::warn!(error = %e, "dispatch failed");
                    }
                }
            }
        }
    }

    /// Normalize one envelope and act on it.
    pub async fn dispatch(&self, conn: &Arc<Connection>, mut env: Envelope) -> Result<()> {
        env.normalize();
        let kind = env.kind();
        self.metrics.envelopes_in.inc(&[("kind", kind.label())]);

        match &kind {
            MsgKind::Ping => conn.send(&Envelope::pong(env.id)).await,
            MsgKind::Subscribe => {
                // An empty room is tolerated: no join, no ack, no error.
                let Some(room) = env.room_name() else {
                    return Ok(());
                };
                if self.registry.join(conn, room) {
                    tracing::debug!(%room, "joined room");
                }
                conn.send(&Envelope::subscribed(room, env.id.as_str())).await
            }
            MsgKind::Action => {
                self.bridge.publish_action(&env).await;
                Ok(())
            }
            MsgKind::Pong | MsgKind::Subscribed | MsgKind::Update | MsgKind::Other(_) => {
                tracing::debug!(kind = kind.as_str(), "ignored envelope type");
                Ok(())
            }
        }
    }
}
