//! Session wiring for one authenticated connection.
//!
//! Three tasks share one cancellation scope (a child of gateway shutdown):
//! - the dispatcher read loop (runs inline, its end is the session's end),
//! - keep-alive,
//! - the writer, the only task that touches the socket's sending half.
//!
//! When the read loop returns, the connection leaves every room, the scope is
//! cancelled, and the writer closes the socket with a normal-closure frame.
//! The close is bounded: a peer that stopped reading is dropped without one.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, Message};
use futures_util::{Sink, SinkExt, Stream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::app_state::AppState;
use crate::realtime::Connection;
use crate::transport::{codec, keepalive};

pub async fn run_session<R, E, W>(app: AppState, identity: String, inbound: R, outbound: W)
where
    R: Stream<Item = Result<Message, E>> + Send,
    E: Display + Send,
    W: Sink<Message> + Send + 'static,
    W::Error: Display,
{
    let gw = &app.cfg().gateway;
    let keepalive_every = gw.keepalive_interval();
    let close_within = gw.fanout_timeout();
    let (conn, out_rx) = Connection::new(identity, gw.outbound_queue, app.shutdown_token().child_token());

    let span = tracing::info_span!("session", cid = %conn.id(), uid = %conn.identity());
    async move {
        tracing::info!("client connected");
        app.metrics().connections.inc(&[("outcome", "accepted")]);
        app.metrics().active_connections.inc();

        let writer = tokio::spawn(
            write_loop(out_rx, outbound, conn.cancel_token().clone(), close_within).in_current_span(),
        );
        let pinger = tokio::spawn(keepalive::run(Arc::clone(&conn), keepalive_every).in_current_span());

        app.dispatcher().run(&conn, inbound).await;

        let left = app.registry().leave_all(&conn);
        conn.close();
        let _ = pinger.await;
        let _ = writer.await;

        app.metrics().active_connections.dec();
        tracing::info!(rooms_left = left, "client disconnected");
    }
    .instrument(span)
    .await
}

/// Drain the outbound queue into the socket until cancelled.
///
/// Every write races the cancellation scope; the closing handshake is
/// bounded by `close_within`.
async fn write_loop<W>(
    mut rx: mpsc::Receiver<Message>,
    sink: W,
    cancel: CancellationToken,
    close_within: Duration,
) where
    W: Sink<Message>,
    W::Error: Display,
{
    let mut sink = Box::pin(sink);
    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(m) => m,
                None => break,
            },
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = sink.send(msg) => {
                if let Err(e) = res {
                    tracing::debug!(error = %e, "write failed");
                }
            }
        }
    }

    let farewell = async {
        let _ = sink.send(codec::close_frame(close_code::NORMAL, "bye")).await;
        let _ = sink.close().await;
    };
    if timeout(close_within, farewell).await.is_err() {
        tracing::debug!("close frame not flushed; dropping socket");
    }
}
