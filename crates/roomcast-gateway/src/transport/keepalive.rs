//! Per-connection keep-alive: an application-level `ping` envelope on a fixed
//! interval until the connection's cancellation scope fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use roomcast_core::protocol::Envelope;

use crate::realtime::Connection;

pub async fn run(conn: Arc<Connection>, every: Duration) {
    let cancel = conn.cancel_token().clone();
    let mut tick = interval_at(Instant::now() + every, every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                // Failures are ignored: the read loop notices a dead channel.
                let ping = Envelope::ping();
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    res = conn.send(&ping) => {
                        if let Err(e) = res {
                            tracing::trace!(error = %e, "keep-alive ping failed");
                        }
                    }
                }
            }
        }
    }
}
