//! Public data structures for chat messages and derived conversations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::entities::chat_messages;

/// A persisted chat message between two users about one listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Monotonic message id, assigned on append
    pub id: i64,
    pub listing_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    /// Server-assigned at persistence time
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    /// Users that have hidden this message from their own view.
    /// Not sent over the wire.
    #[serde(skip)]
    pub deleted_by: HashSet<String>,
}

impl Message {
    /// Whether `viewer_id` has soft-deleted this message
    pub fn is_deleted_for(&self, viewer_id: &str) -> bool {
        self.deleted_by.contains(viewer_id)
    }

    /// The other participant relative to `user_id`
    pub fn counterpart_of(&self, user_id: &str) -> &str {
        if self.sender_id == user_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }

    pub(crate) fn from_model(model: chat_messages::Model, deleted_by: HashSet<String>) -> Self {
        Self {
            id: model.id,
            listing_id: model.listing_id,
            sender_id: model.sender_id,
            receiver_id: model.receiver_id,
            body: model.body,
            created_at: millis_to_datetime(model.created_at),
            read: model.read,
            read_at: model.read_at.map(millis_to_datetime),
            deleted_by,
        }
    }
}

/// A conversation as seen by one viewer, derived from the message ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub listing_id: String,
    /// The other participant relative to the viewer
    #[serde(rename = "otherUser")]
    pub counterpart_id: String,
    #[serde(rename = "otherUserName")]
    pub counterpart_name: String,
    pub listing_name: String,
    pub last_message: String,
    #[serde(rename = "lastTimestamp")]
    pub last_message_at: DateTime<Utc>,
    pub last_message_id: i64,
    pub last_sender_id: String,
    /// Unread messages addressed to the viewer in this conversation
    pub unread_count: u64,
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
