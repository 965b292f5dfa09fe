use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use super::types::{Connection, ConnectionId, OutboundMessage, Participant, RoomId, UNKNOWN_NAME};

/// Owns every live connection record. Rooms are not stored anywhere;
/// `members_of` derives them from the membership sets on demand, so there is
/// no second collection that could drift from actual membership.
///
/// All mutation and derivation happens on the relay actor task, so a roster
/// computed here always reflects the registry as of that command.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record with no display name and no memberships.
    /// Registering an already-known id is a no-op.
    pub fn register(&mut self, id: ConnectionId, tx: mpsc::UnboundedSender<OutboundMessage>) {
        if self.connections.contains_key(&id) {
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.connections.insert(
            id,
            Connection {
                display_name: None,
                rooms: HashSet::new(),
                seq,
                tx,
            },
        );
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn set_display_name(&mut self, id: ConnectionId, name: &str) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.display_name = Some(name.to_string());
        }
    }

    /// Display name for `id`, falling back to the "unknown" sentinel when the
    /// connection never set one or is not registered.
    pub fn display_name(&self, id: ConnectionId) -> &str {
        self.connections
            .get(&id)
            .and_then(|conn| conn.display_name.as_deref())
            .unwrap_or(UNKNOWN_NAME)
    }

    /// Add `room` to the connection's membership set. Unknown id: no-op.
    pub fn join_room(&mut self, id: ConnectionId, room: RoomId) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.rooms.insert(room);
        }
    }

    /// Atomically take the connection's membership set, leaving it empty.
    /// Called exactly once at disconnect; after this the connection is
    /// invisible to `members_of` even though the record still exists.
    pub fn leave_all_rooms(&mut self, id: ConnectionId) -> HashSet<RoomId> {
        self.connections
            .get_mut(&id)
            .map(|conn| std::mem::take(&mut conn.rooms))
            .unwrap_or_default()
    }

    pub fn remove(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Outbound channel for a live connection, for directed delivery.
    pub fn sender(&self, id: ConnectionId) -> Option<&mpsc::UnboundedSender<OutboundMessage>> {
        self.connections.get(&id).map(|conn| &conn.tx)
    }

    /// Connections currently in `room`, in join order.
    pub fn members_of(&self, room: RoomId) -> Vec<ConnectionId> {
        let mut members: Vec<(u64, ConnectionId)> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.rooms.contains(&room))
            .map(|(id, conn)| (conn.seq, *id))
            .collect();
        members.sort_unstable_by_key(|(seq, _)| *seq);
        members.into_iter().map(|(_, id)| id).collect()
    }

    /// `members_of` joined with display names: the exact roster payload
    /// broadcast to clients.
    pub fn participant_view(&self, room: RoomId) -> Vec<Participant> {
        self.members_of(room)
            .into_iter()
            .map(|id| Participant {
                connection_id: id,
                display_name: self.display_name(id).to_string(),
            })
            .collect()
    }
}
