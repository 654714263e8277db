use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use super::Connection;

type Members = HashMap<String, Weak<Connection>>;

/// Room registry: `room -> {connection id -> connection}`.
///
/// Invariants, held under the single write lock:
/// - `c` is a member of `r` iff `r` is in `c.rooms()`.
/// - A room with no members has no entry.
///
/// Rooms hold weak handles: membership never keeps a connection alive.
/// The lock is never held across an await.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Members>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Members>> {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Members>> {
        self.rooms.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `conn` to `room`. Returns false if it was already a member.
    pub fn join(&self, conn: &Arc<Connection>, room: &str) -> bool {
        let mut rooms = self.write();
        let inserted = rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn.id().to_string(), Arc::downgrade(conn))
            .is_none();
        conn.rooms_mut().insert(room.to_string());
        inserted
    }

    /// Remove `conn` from every room it joined, dropping rooms left empty.
    /// Returns how many rooms it left.
    pub fn leave_all(&self, conn: &Connection) -> usize {
        let mut rooms = self.write();
        let joined = std::mem::take(&mut *conn.rooms_mut());
        for room in &joined {
            if let Some(members) = rooms.get_mut(room) {
                members.remove(conn.id());
                if members.is_empty() {
                    rooms.remove(room);
                }
            }
        }
        joined.len()
    }

    /// Live members of `room`. The read lock is released before returning.
    pub fn snapshot(&self, room: &str) -> Vec<Arc<Connection>> {
        self.read()
            .get(room)
            .map(|members| members.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, room: &str, conn_id: &str) -> bool {
        self.read()
            .get(room)
            .is_some_and(|members| members.contains_key(conn_id))
    }

    pub fn members(&self, room: &str) -> usize {
        self.read().get(room).map_or(0, HashMap::len)
    }

    pub fn room_count(&self) -> usize {
        self.read().len()
    }
}
