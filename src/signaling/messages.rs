use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ConnectionId, Participant, RoomId};

/// Messages sent from client to server.
///
/// Signal payloads (SDP, ICE candidates) and collaboration payloads (strokes,
/// notes, flags) are opaque to the relay and forwarded verbatim.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Enter a room under a display name
    JoinRoom { room_id: RoomId, display_name: String },

    /// Session description offer, addressed to one connection
    SignalOffer {
        target_connection_id: ConnectionId,
        payload: Value,
    },

    /// Session description answer, addressed to one connection
    SignalAnswer {
        target_connection_id: ConnectionId,
        payload: Value,
    },

    /// ICE candidate, addressed to one connection
    SignalIce {
        target_connection_id: ConnectionId,
        payload: Value,
    },

    /// Chat line for the whole room (sender included on delivery)
    ChatMessage {
        room_id: RoomId,
        display_name: String,
        text: String,
        color_hint: String,
    },

    /// Whiteboard stroke
    DrawStroke { room_id: RoomId, payload: Value },

    /// Shared-notes edit
    NoteUpdate { room_id: RoomId, payload: Value },

    /// Who is currently speaking
    SpeakingFlag { room_id: RoomId, payload: Value },

    /// Who is currently drawing on the board
    BoardActiveFlag { room_id: RoomId, payload: Value },

    /// Screen share started or stopped
    ScreenShareToggle { room_id: RoomId, payload: Value },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent once at accept so the client knows its own connection id
    Connected { connection_id: ConnectionId },

    /// Full replacement roster for a room
    RoomRoster { participants: Vec<Participant> },

    /// Chat line, user-sent or server-synthesized (join/leave notices)
    ChatMessage {
        display_name: String,
        text: String,
        color_hint: String,
        timestamp: DateTime<Utc>,
        is_system_generated: bool,
    },

    /// Relayed offer with the sender's id stamped on
    SignalOffer {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    /// Relayed answer with the sender's id stamped on
    SignalAnswer {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    /// Relayed ICE candidate with the sender's id stamped on
    SignalIce {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    DrawStroke {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    NoteUpdate {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    SpeakingFlag {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    BoardActiveFlag {
        from_connection_id: ConnectionId,
        payload: Value,
    },

    ScreenShareToggle {
        from_connection_id: ConnectionId,
        payload: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join_room() {
        let json = r#"{"type": "join-room", "roomId": "alpha", "displayName": "Kim"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::JoinRoom {
            room_id,
            display_name,
        } = msg
        {
            assert_eq!(room_id.as_str(), "alpha");
            assert_eq!(display_name, "Kim");
        } else {
            panic!("Expected JoinRoom");
        }
    }

    #[test]
    fn parse_join_room_without_room_id_fails() {
        let json = r#"{"type": "join-room", "displayName": "Kim"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn parse_signal_offer() {
        let json = r#"{"type": "signal-offer", "targetConnectionId": "conn_bbbb0002", "payload": {"sdp": "v=0"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::SignalOffer {
            target_connection_id,
            payload,
        } = msg
        {
            assert_eq!(target_connection_id.as_str(), "conn_bbbb0002");
            assert_eq!(payload["sdp"], "v=0");
        } else {
            panic!("Expected SignalOffer");
        }
    }

    #[test]
    fn parse_signal_ice() {
        let json = r#"{"type": "signal-ice", "targetConnectionId": "conn_bbbb0002", "payload": {"candidate": "c"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::SignalIce { .. }));
    }

    #[test]
    fn parse_chat_message() {
        let json = r##"{"type": "chat-message", "roomId": "alpha", "displayName": "Kim", "text": "hi", "colorHint": "#aa3366"}"##;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::ChatMessage {
            room_id,
            display_name,
            text,
            color_hint,
        } = msg
        {
            assert_eq!(room_id.as_str(), "alpha");
            assert_eq!(display_name, "Kim");
            assert_eq!(text, "hi");
            assert_eq!(color_hint, "#aa3366");
        } else {
            panic!("Expected ChatMessage");
        }
    }

    #[test]
    fn parse_collab_kinds() {
        for kind in [
            "draw-stroke",
            "note-update",
            "speaking-flag",
            "board-active-flag",
            "screen-share-toggle",
        ] {
            let json = format!(r#"{{"type": "{}", "roomId": "alpha", "payload": {{}}}}"#, kind);
            let msg: ClientMessage = serde_json::from_str(&json)
                .unwrap_or_else(|e| panic!("failed to parse {}: {}", kind, e));
            match msg {
                ClientMessage::DrawStroke { .. }
                | ClientMessage::NoteUpdate { .. }
                | ClientMessage::SpeakingFlag { .. }
                | ClientMessage::BoardActiveFlag { .. }
                | ClientMessage::ScreenShareToggle { .. } => {}
                other => panic!("unexpected variant for {}: {:?}", kind, other),
            }
        }
    }

    #[test]
    fn serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: ConnectionId::from("conn_abc12345"),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connectionId\":\"conn_abc12345\""));
    }

    #[test]
    fn serialize_room_roster() {
        let msg = ServerMessage::RoomRoster {
            participants: vec![Participant {
                connection_id: ConnectionId::from("conn_abc12345"),
                display_name: "Kim".to_string(),
            }],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"room-roster\""));
        assert!(json.contains("\"participants\""));
        assert!(json.contains("\"displayName\":\"Kim\""));
    }

    #[test]
    fn serialize_chat_message() {
        let msg = ServerMessage::ChatMessage {
            display_name: "Kim".to_string(),
            text: "Kim joined.".to_string(),
            color_hint: "#666666".to_string(),
            timestamp: Utc::now(),
            is_system_generated: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"chat-message\""));
        assert!(json.contains("\"isSystemGenerated\":true"));
        assert!(json.contains("\"colorHint\":\"#666666\""));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn serialize_signal_answer() {
        let msg = ServerMessage::SignalAnswer {
            from_connection_id: ConnectionId::from("conn_abc12345"),
            payload: serde_json::json!({"sdp": "v=0"}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"signal-answer\""));
        assert!(json.contains("\"fromConnectionId\":\"conn_abc12345\""));
    }

    #[test]
    fn serialize_draw_stroke() {
        let msg = ServerMessage::DrawStroke {
            from_connection_id: ConnectionId::from("conn_abc12345"),
            payload: serde_json::json!({"points": [1, 2]}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"draw-stroke\""));
        assert!(json.contains("\"fromConnectionId\""));
    }
}
