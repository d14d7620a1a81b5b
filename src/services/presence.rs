//! Presence registry: who is connected, and which room each identity occupies.
//!
//! All state lives behind one lock. Each public operation takes it exactly once, so the
//! per-identity entries and the per-room online sets are always observed in agreement:
//! a user is in `rooms[r]` iff its entry's room is `r`. Callers never hold the lock
//! across I/O; fan-out works from a snapshot of connection handles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::models::{ConnectionHandle, ConnectionId, Identity, OnlineUser, RoomId, ServerEvent, UserId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresenceError {
    /// The caller's connection is not (or no longer) the live one for its identity.
    #[error("connection is not registered")]
    NotConnected,
}

/// A prior connection displaced by a newer one for the same identity.
#[derive(Debug)]
pub struct Superseded {
    pub connection: ConnectionHandle,
    /// Room the displaced connection was removed from, if any.
    pub room: Option<RoomId>,
}

struct PresenceEntry {
    identity: Identity,
    connection: ConnectionHandle,
    room: Option<RoomId>,
}

#[derive(Default)]
struct PresenceState {
    entries: HashMap<UserId, PresenceEntry>,
    rooms: HashMap<RoomId, HashSet<UserId>>,
}

fn leave_room(rooms: &mut HashMap<RoomId, HashSet<UserId>>, user_id: UserId, room: &RoomId) {
    if let Some(set) = rooms.get_mut(room) {
        set.remove(&user_id);
        if set.is_empty() {
            rooms.remove(room);
        }
    }
}

#[derive(Clone, Default)]
pub struct PresenceRegistry {
    state: Arc<RwLock<PresenceState>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `connection` as the live connection for `identity`. An older connection for
    /// the same identity is superseded: its room membership is retracted in the same step.
    #[instrument(skip_all, fields(user_id = %identity.user_id(), connection_id = %connection.id()))]
    pub async fn record_connect(
        &self,
        identity: Identity,
        connection: ConnectionHandle,
    ) -> Option<Superseded> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let user_id = identity.user_id();

        let (room, superseded) = match state.entries.remove(&user_id) {
            Some(prev) if prev.connection.id() == connection.id() => (prev.room, None),
            Some(prev) => {
                if let Some(room) = &prev.room {
                    leave_room(&mut state.rooms, user_id, room);
                }
                info!(previous = %prev.connection.id(), "connection superseded");
                (
                    None,
                    Some(Superseded {
                        connection: prev.connection,
                        room: prev.room,
                    }),
                )
            }
            None => (None, None),
        };

        state.entries.insert(
            user_id,
            PresenceEntry {
                identity,
                connection,
                room,
            },
        );
        superseded
    }

    /// Move the identity into `room`, leaving its previous room (if any) in the same step.
    /// Returns the previous room.
    #[instrument(skip(self))]
    pub async fn move_to_room(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
        room: &RoomId,
    ) -> Result<Option<RoomId>, PresenceError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let entry = state
            .entries
            .get_mut(&user_id)
            .filter(|e| e.connection.id() == connection_id)
            .ok_or(PresenceError::NotConnected)?;
        let previous = entry.room.replace(room.clone());

        if let Some(prev) = previous.as_ref().filter(|prev| *prev != room) {
            leave_room(&mut state.rooms, user_id, prev);
        }
        state.rooms.entry(room.clone()).or_default().insert(user_id);
        debug!(previous = ?previous, "moved to room");
        Ok(previous)
    }

    /// Drop the identity's entry if `connection_id` is still its live connection.
    /// Returns the room it was removed from. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn remove_connection(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
    ) -> Option<RoomId> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.entries.get(&user_id) {
            Some(entry) if entry.connection.id() == connection_id => {}
            _ => return None,
        }
        let entry = state.entries.remove(&user_id)?;
        if let Some(room) = &entry.room {
            leave_room(&mut state.rooms, user_id, room);
        }
        entry.room
    }

    /// Snapshot of the room's online users, sorted by label then id.
    pub async fn list_online(&self, room: &RoomId) -> Vec<OnlineUser> {
        let state = self.state.read().await;
        let mut users: Vec<OnlineUser> = state
            .rooms
            .get(room)
            .into_iter()
            .flatten()
            .filter_map(|user_id| state.entries.get(user_id))
            .map(|entry| entry.identity.to_online_user())
            .collect();
        users.sort_by(|a, b| a.label.cmp(&b.label).then(a.user_id.cmp(&b.user_id)));
        users
    }

    /// True if `connection_id` is the identity's live connection and it is in `room`.
    pub async fn is_present(
        &self,
        user_id: UserId,
        connection_id: &ConnectionId,
        room: &RoomId,
    ) -> bool {
        let state = self.state.read().await;
        state.entries.get(&user_id).is_some_and(|entry| {
            entry.connection.id() == connection_id && entry.room.as_ref() == Some(room)
        })
    }

    /// Snapshot of the connections present in `room`, optionally excluding one identity.
    pub async fn recipients(&self, room: &RoomId, except: Option<UserId>) -> Vec<ConnectionHandle> {
        let state = self.state.read().await;
        state
            .rooms
            .get(room)
            .into_iter()
            .flatten()
            .filter(|user_id| Some(**user_id) != except)
            .filter_map(|user_id| state.entries.get(user_id))
            .map(|entry| entry.connection.clone())
            .collect()
    }

    /// Deliver `event` to everyone present in `room` (minus `except`). The lock is released
    /// before delivery. Returns how many connections accepted the event.
    pub async fn broadcast(&self, room: &RoomId, event: ServerEvent, except: Option<UserId>) -> usize {
        let recipients = self.recipients(room, except).await;
        let delivered = recipients
            .iter()
            .filter(|conn| conn.deliver(event.clone()))
            .count();
        debug!(room = %room, delivered, "broadcast");
        delivered
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    #[cfg(test)]
    pub(crate) async fn assert_consistent(&self) {
        let state = self.state.read().await;
        for (user_id, entry) in &state.entries {
            if let Some(room) = &entry.room {
                assert!(
                    state.rooms.get(room).is_some_and(|s| s.contains(user_id)),
                    "{user_id} has room {room} but is missing from its set"
                );
            }
        }
        for (room, users) in &state.rooms {
            assert!(!users.is_empty(), "empty set left behind for {room}");
            for user_id in users {
                let entry_room = state.entries.get(user_id).and_then(|e| e.room.as_ref());
                assert_eq!(entry_room, Some(room), "{user_id} listed in {room} without entry");
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn identity(label: &str) -> Identity {
        Identity::new(UserId(Uuid::new_v4()), label)
    }

    fn connection() -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(ConnectionId::generate(), tx), rx)
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id)
    }

    #[tokio::test]
    async fn move_to_room_evicts_previous_room() {
        let registry = PresenceRegistry::new();
        let u = identity("u@example.com");
        let (conn, _rx) = connection();
        let conn_id = conn.id().clone();
        registry.record_connect(u.clone(), conn).await;

        assert_eq!(registry.move_to_room(u.user_id(), &conn_id, &room("a")).await, Ok(None));
        assert_eq!(
            registry.move_to_room(u.user_id(), &conn_id, &room("b")).await,
            Ok(Some(room("a")))
        );

        assert!(registry.list_online(&room("a")).await.is_empty());
        assert_eq!(registry.list_online(&room("b")).await, vec![u.to_online_user()]);
        assert_eq!(registry.room_count().await, 1);
        registry.assert_consistent().await;
    }

    #[tokio::test]
    async fn rejoining_same_room_is_idempotent() {
        let registry = PresenceRegistry::new();
        let u = identity("u@example.com");
        let (conn, _rx) = connection();
        let conn_id = conn.id().clone();
        registry.record_connect(u.clone(), conn).await;

        registry.move_to_room(u.user_id(), &conn_id, &room("a")).await.unwrap();
        let prev = registry.move_to_room(u.user_id(), &conn_id, &room("a")).await.unwrap();
        assert_eq!(prev, Some(room("a")));
        assert_eq!(registry.list_online(&room("a")).await.len(), 1);
        registry.assert_consistent().await;
    }

    #[tokio::test]
    async fn move_requires_live_connection() {
        let registry = PresenceRegistry::new();
        let u = identity("u@example.com");
        let result = registry
            .move_to_room(u.user_id(), &ConnectionId::generate(), &room("a"))
            .await;
        assert_eq!(result, Err(PresenceError::NotConnected));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn second_connect_supersedes_first() {
        let registry = PresenceRegistry::new();
        let u = identity("u@example.com");
        let (first, _rx1) = connection();
        let first_id = first.id().clone();
        registry.record_connect(u.clone(), first).await;
        registry.move_to_room(u.user_id(), &first_id, &room("a")).await.unwrap();

        let (second, _rx2) = connection();
        let second_id = second.id().clone();
        let superseded = registry.record_connect(u.clone(), second).await.unwrap();
        assert_eq!(superseded.connection.id(), &first_id);
        assert_eq!(superseded.room, Some(room("a")));
        assert!(registry.list_online(&room("a")).await.is_empty());
        registry.assert_consistent().await;

        // the displaced connection can no longer touch presence
        assert_eq!(
            registry.move_to_room(u.user_id(), &first_id, &room("b")).await,
            Err(PresenceError::NotConnected)
        );
        assert_eq!(registry.remove_connection(u.user_id(), &first_id).await, None);
        assert_eq!(registry.connection_count().await, 1);

        registry.move_to_room(u.user_id(), &second_id, &room("b")).await.unwrap();
        assert_eq!(registry.list_online(&room("b")).await, vec![u.to_online_user()]);
    }

    #[tokio::test]
    async fn remove_connection_is_idempotent() {
        let registry = PresenceRegistry::new();
        let u = identity("u@example.com");
        let (conn, _rx) = connection();
        let conn_id = conn.id().clone();
        registry.record_connect(u.clone(), conn).await;
        registry.move_to_room(u.user_id(), &conn_id, &room("a")).await.unwrap();

        assert_eq!(registry.remove_connection(u.user_id(), &conn_id).await, Some(room("a")));
        assert_eq!(registry.remove_connection(u.user_id(), &conn_id).await, None);
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn list_online_is_sorted_by_label() {
        let registry = PresenceRegistry::new();
        for label in ["carol@x.io", "alice@x.io", "bob@x.io"] {
            let u = identity(label);
            let (conn, _rx) = connection();
            let conn_id = conn.id().clone();
            registry.record_connect(u.clone(), conn).await;
            registry.move_to_room(u.user_id(), &conn_id, &room("a")).await.unwrap();
        }
        let labels: Vec<String> = registry
            .list_online(&room("a"))
            .await
            .into_iter()
            .map(|u| u.label)
            .collect();
        assert_eq!(labels, ["alice@x.io", "bob@x.io", "carol@x.io"]);
    }

    #[tokio::test]
    async fn broadcast_skips_excluded_and_other_rooms() {
        let registry = PresenceRegistry::new();
        let a = identity("a@x.io");
        let b = identity("b@x.io");
        let c = identity("c@x.io");
        let (ca, mut rxa) = connection();
        let (cb, mut rxb) = connection();
        let (cc, mut rxc) = connection();
        let c_conn = cc.id().clone();
        for (who, conn, r) in [(&a, ca, "r1"), (&b, cb, "r1"), (&c, cc, "r2")] {
            let id = conn.id().clone();
            registry.record_connect(who.clone(), conn).await;
            registry.move_to_room(who.user_id(), &id, &room(r)).await.unwrap();
        }

        let delivered = registry
            .broadcast(&room("r1"), ServerEvent::Pong, Some(a.user_id()))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(rxb.try_recv().unwrap(), ServerEvent::Pong);
        assert!(rxa.try_recv().is_err());
        assert!(rxc.try_recv().is_err());
        assert!(registry.is_present(c.user_id(), &c_conn, &room("r2")).await);
        assert!(!registry.is_present(c.user_id(), &c_conn, &room("r1")).await);

        let (replacement, _rx) = connection();
        registry.record_connect(c.clone(), replacement).await;
        assert!(!registry.is_present(c.user_id(), &c_conn, &room("r2")).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn invariants_hold_under_concurrent_churn() {
        let registry = PresenceRegistry::new();
        let rooms: Vec<RoomId> = (0..4).map(|i| room(&format!("room-{i}"))).collect();
        let users: Vec<Identity> = (0..16).map(|i| identity(&format!("u{i}@x.io"))).collect();

        let mut tasks = Vec::new();
        for (i, user) in users.iter().cloned().enumerate() {
            let registry = registry.clone();
            let rooms = rooms.clone();
            tasks.push(tokio::spawn(async move {
                let mut receivers = Vec::new();
                for step in 0..60usize {
                    let (conn, rx) = connection();
                    let conn_id = conn.id().clone();
                    receivers.push(rx);
                    registry.record_connect(user.clone(), conn).await;
                    for hop in 0..3 {
                        let target = &rooms[(i + step + hop) % rooms.len()];
                        let _ = registry.move_to_room(user.user_id(), &conn_id, target).await;
                        tokio::task::yield_now().await;
                    }
                    if (i + step) % 3 == 0 {
                        registry.remove_connection(user.user_id(), &conn_id).await;
                        registry.remove_connection(user.user_id(), &conn_id).await;
                    }
                }
            }));
        }
        let checker = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    registry.assert_consistent().await;
                    tokio::task::yield_now().await;
                }
            })
        };
        for t in tasks {
            t.await.unwrap();
        }
        checker.await.unwrap();
        registry.assert_consistent().await;

        // every identity appears in at most one room
        let mut seen = HashSet::new();
        for r in &rooms {
            for u in registry.list_online(r).await {
                assert!(seen.insert(u.user_id), "{} present in two rooms", u.user_id);
            }
        }
    }
}
