use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{ClientMessage, ServerMessage};
use super::registry::Registry;
use super::types::{ConnectionId, OutboundMessage, Participant, RoomId, SignalingError};

/// Color hint stamped on server-synthesized join/leave notices.
const SYSTEM_COLOR: &str = "#666666";

/// Commands sent to the relay actor
pub(crate) enum RelayCommand {
    Register {
        id: ConnectionId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    },
    Inbound {
        from: ConnectionId,
        message: ClientMessage,
    },
    Disconnecting {
        id: ConnectionId,
    },
    Remove {
        id: ConnectionId,
    },
    Roster {
        room: RoomId,
        reply: oneshot::Sender<Vec<Participant>>,
    },
}

/// Single task owning the registry. Every mutation and every roster
/// derivation runs here, one command at a time, so the roster/notice pair
/// emitted for a join or a disconnect can never interleave with another
/// connection's churn.
pub(crate) async fn relay_actor(mut rx: mpsc::Receiver<RelayCommand>) {
    let mut registry = Registry::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RelayCommand::Register { id, tx } => {
                registry.register(id, tx);
                debug!("Connection {} registered", id);
            }

            RelayCommand::Inbound { from, message } => {
                handle_inbound(&mut registry, from, message);
            }

            RelayCommand::Disconnecting { id } => {
                handle_disconnecting(&mut registry, id);
            }

            RelayCommand::Remove { id } => {
                registry.remove(id);
                debug!("Connection {} removed", id);
            }

            RelayCommand::Roster { room, reply } => {
                let _ = reply.send(registry.participant_view(room));
            }
        }
    }
}

/// Single dispatch point for everything a client can send. The match is
/// exhaustive over the closed message set, so adding a kind without routing
/// it is a compile error.
fn handle_inbound(registry: &mut Registry, from: ConnectionId, message: ClientMessage) {
    match message {
        ClientMessage::JoinRoom {
            room_id,
            display_name,
        } => handle_join(registry, from, room_id, display_name),

        ClientMessage::SignalOffer {
            target_connection_id,
            payload,
        } => relay_directed(
            registry,
            target_connection_id,
            ServerMessage::SignalOffer {
                from_connection_id: from,
                payload,
            },
        ),

        ClientMessage::SignalAnswer {
            target_connection_id,
            payload,
        } => relay_directed(
            registry,
            target_connection_id,
            ServerMessage::SignalAnswer {
                from_connection_id: from,
                payload,
            },
        ),

        ClientMessage::SignalIce {
            target_connection_id,
            payload,
        } => relay_directed(
            registry,
            target_connection_id,
            ServerMessage::SignalIce {
                from_connection_id: from,
                payload,
            },
        ),

        // Chat goes to the whole room, sender included: the sender's client
        // renders its own line from the relayed copy, with the server's
        // timestamp.
        ClientMessage::ChatMessage {
            room_id,
            display_name,
            text,
            color_hint,
        } => {
            let chat = ServerMessage::ChatMessage {
                display_name,
                text,
                color_hint,
                timestamp: Utc::now(),
                is_system_generated: false,
            };
            broadcast(registry, room_id, &chat, None);
        }

        // Collaboration updates are observational for everyone else; the
        // sender already has the state locally and is excluded.
        ClientMessage::DrawStroke { room_id, payload } => {
            let msg = ServerMessage::DrawStroke {
                from_connection_id: from,
                payload,
            };
            broadcast(registry, room_id, &msg, Some(from));
        }

        ClientMessage::NoteUpdate { room_id, payload } => {
            let msg = ServerMessage::NoteUpdate {
                from_connection_id: from,
                payload,
            };
            broadcast(registry, room_id, &msg, Some(from));
        }

        ClientMessage::SpeakingFlag { room_id, payload } => {
            let msg = ServerMessage::SpeakingFlag {
                from_connection_id: from,
                payload,
            };
            broadcast(registry, room_id, &msg, Some(from));
        }

        ClientMessage::BoardActiveFlag { room_id, payload } => {
            let msg = ServerMessage::BoardActiveFlag {
                from_connection_id: from,
                payload,
            };
            broadcast(registry, room_id, &msg, Some(from));
        }

        ClientMessage::ScreenShareToggle { room_id, payload } => {
            let msg = ServerMessage::ScreenShareToggle {
                from_connection_id: from,
                payload,
            };
            broadcast(registry, room_id, &msg, Some(from));
        }
    }
}

fn handle_join(registry: &mut Registry, id: ConnectionId, room: RoomId, display_name: String) {
    if !registry.contains(id) {
        return;
    }
    registry.set_display_name(id, &display_name);
    registry.join_room(id, room);
    info!("{} joined room {} as \"{}\"", id, room, display_name);

    // Roster first, then the notice, both within this dispatch step: every
    // member sees the post-join roster no later than the join message.
    let roster = ServerMessage::RoomRoster {
        participants: registry.participant_view(room),
    };
    broadcast(registry, room, &roster, None);

    let text = format!("{} joined.", display_name);
    broadcast(registry, room, &system_notice(display_name, text), None);
}

fn handle_disconnecting(registry: &mut Registry, id: ConnectionId) {
    let display_name = registry.display_name(id).to_string();

    // Atomic take: after this the connection is gone from every derived
    // member set, even though its record survives until Remove. A repeated
    // disconnect signal takes an empty set and emits nothing.
    let rooms = registry.leave_all_rooms(id);

    for room in rooms {
        let text = format!("{} left.", display_name);
        broadcast(registry, room, &system_notice(display_name.clone(), text), None);

        let roster = ServerMessage::RoomRoster {
            participants: registry.participant_view(room),
        };
        broadcast(registry, room, &roster, None);

        info!("{} left room {}", id, room);
    }
}

fn system_notice(display_name: String, text: String) -> ServerMessage {
    ServerMessage::ChatMessage {
        display_name,
        text,
        color_hint: SYSTEM_COLOR.to_string(),
        timestamp: Utc::now(),
        is_system_generated: true,
    }
}

/// Deliver to exactly one connection. No room check: directed signaling is
/// addressed by id alone. Unknown targets drop silently.
fn relay_directed(registry: &Registry, target: ConnectionId, message: ServerMessage) {
    match registry.sender(target) {
        Some(tx) => {
            let _ = tx.send(encode(&message));
        }
        None => debug!("Dropping directed message for unknown connection {}", target),
    }
}

/// Deliver to every member of `room`, minus `exclude`. An empty room is a
/// legal no-op.
fn broadcast(
    registry: &Registry,
    room: RoomId,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) {
    let encoded = encode(message);
    for member in registry.members_of(room) {
        if Some(member) == exclude {
            continue;
        }
        if let Some(tx) = registry.sender(member) {
            let _ = tx.send(encoded.clone());
        }
    }
}

fn encode(message: &ServerMessage) -> OutboundMessage {
    let json =
        serde_json::to_string(message).expect("ServerMessage serialization should never fail");
    OutboundMessage::from(json)
}

/// Handle to communicate with the relay actor
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Register a fresh connection and its outbound channel
    pub async fn register(&self, id: ConnectionId, tx: mpsc::UnboundedSender<OutboundMessage>) {
        let _ = self.tx.send(RelayCommand::Register { id, tx }).await;
    }

    /// Route one inbound client message
    pub async fn dispatch(&self, from: ConnectionId, message: ClientMessage) {
        let _ = self.tx.send(RelayCommand::Inbound { from, message }).await;
    }

    /// Transport says the connection is about to close
    pub async fn disconnecting(&self, id: ConnectionId) {
        let _ = self.tx.send(RelayCommand::Disconnecting { id }).await;
    }

    /// Final teardown, after the leave notices went out
    pub async fn remove(&self, id: ConnectionId) {
        let _ = self.tx.send(RelayCommand::Remove { id }).await;
    }

    /// Current roster for a room
    pub async fn roster(&self, room: RoomId) -> Result<Vec<Participant>, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(RelayCommand::Roster {
                room,
                reply: reply_tx,
            })
            .await;
        reply_rx.await.map_err(|_| SignalingError::RelayClosed)
    }
}
