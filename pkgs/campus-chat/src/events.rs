//! Live channel wire events
//!
//! Frames are JSON objects tagged by `type`, with camelCase field names.

use campus_store::Message;
use serde::{Deserialize, Serialize};

/// Events sent by a client over the live channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Join the listing room and, optionally, the caller's personal room
    JoinRoom {
        listing_id: Option<String>,
        user_id: Option<String>,
    },
    LeaveRoom {
        listing_id: Option<String>,
        user_id: Option<String>,
    },
    /// Send a message as the session's own identity
    ChatMessage {
        listing_id: String,
        receiver: String,
        #[serde(alias = "message")]
        body: String,
        /// Only accepted when it matches the session identity
        sender: Option<String>,
        client_ref: Option<String>,
    },
    Ping,
}

/// Events pushed to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Fan-out of a persisted message
    MessageDelivered { message: Message },
    /// Acknowledgment to the sending session
    MessageSent {
        #[serde(skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
        message: Message,
    },
    SendFailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
        code: String,
        error: String,
    },
    Joined { rooms: Vec<String> },
    Left { rooms: Vec<String> },
    Error { code: String, error: String },
    Pong,
}

impl ServerEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
