//! WebSocket upgrade handler.
//!
//! The credential is taken from `Authorization: Bearer` or `?token=`. The
//! upgrade always completes; an unresolvable credential is answered with a
//! policy-violation close before any session state exists.

use axum::{
    extract::{ws::close_code, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    http::HeaderMap,
    response::Response,
};
use futures_util::StreamExt;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth;
use crate::transport::{codec, session};

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    query: Option<Query<WsQuery>>,
) -> Response {
    // An unparseable query string only loses the query credential.
    let query_token = query.and_then(|Query(q)| q.token);
    let token = auth::extract_token(&headers, query_token.as_deref());
    ws.on_upgrade(move |socket| serve_socket(app, token, socket))
}

async fn serve_socket(app: AppState, token: String, mut socket: WebSocket) {
    let identity = match app.resolver().resolve(&token) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "auth failed");
            app.metrics().connections.inc(&[("outcome", "rejected")]);
            let _ = socket
                .send(codec::close_frame(close_code::POLICY, "unauthorized"))
                .await;
            return;
        }
    };

    let (tx, rx) = socket.split();
    session::run_session(app, identity, rx, tx).await;
}
