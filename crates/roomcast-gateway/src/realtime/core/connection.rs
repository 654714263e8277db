use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::{new_id, Envelope};

use crate::realtime::types::{Delivery, PreparedMsg};

/// One authenticated client session.
///
/// Writes go through a bounded queue drained by a single writer task, so
/// frames to one client are totally ordered and never interleave.
pub struct Connection {
    id: String,
    identity: String,
    tx: mpsc::Sender<Message>,
    /// Rooms this connection belongs to. Only mutated by `RoomRegistry`
    /// while it holds its write lock.
    rooms: Mutex<HashSet<String>>,
    cancel: CancellationToken,
}

impl Connection {
    /// Create a connection and the receiving end of its outbound queue.
    pub fn new(
        identity: impl Into<String>,
        queue: usize,
        cancel: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let conn = Arc::new(Self {
            id: new_id(),
            identity: identity.into(),
            tx,
            rooms: Mutex::new(HashSet::new()),
            cancel,
        });
        (conn, rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Cancellation scope shared by this connection's tasks.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Serialize and queue one envelope, waiting for queue space.
    pub async fn send(&self, env: &Envelope) -> Result<()> {
        let msg = PreparedMsg::from_envelope(env)?;
        self.send_prepared(&msg, Delivery::Unbounded).await
    }

    pub async fn send_prepared(&self, msg: &PreparedMsg, delivery: Delivery) -> Result<()> {
        let frame = msg.to_ws_message();
        match delivery {
            Delivery::Unbounded => self.tx.send(frame).await.map_err(|_| self.queue_closed()),
            Delivery::Bounded { timeout: limit } => timeout(limit, self.tx.send(frame))
                .await
                .map_err(|_| RoomcastError::Timeout)?
                .map_err(|_| self.queue_closed()),
        }
    }

    fn queue_closed(&self) -> RoomcastError {
        RoomcastError::TransportWrite(format!("connection {} outbound queue closed", self.id))
    }

    /// Sorted snapshot of joined rooms.
    pub fn rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.rooms_mut().iter().cloned().collect();
        rooms.sort();
        rooms
    }

    pub fn in_room(&self, room: &str) -> bool {
        self.rooms_mut().contains(room)
    }

    pub(crate) fn rooms_mut(&self) -> MutexGuard<'_, HashSet<String>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
