//! Conversation index - derives a user's conversation list from the ledger
//!
//! Nothing is stored here. Each call scans the messages the user can still see
//! (newest first), so the first message seen for a `(listing, counterpart)`
//! group is its preview and groups come out ordered by recency.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::directory::Directory;
use crate::error::StoreError;
use crate::message_store::MessageStore;
use crate::models::Conversation;
use crate::{FALLBACK_LISTING_NAME, FALLBACK_USER_NAME};

pub struct ConversationIndex {
    store: Arc<MessageStore>,
    directory: Arc<dyn Directory>,
}

impl ConversationIndex {
    pub fn new(store: Arc<MessageStore>, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }

    /// Conversations visible to `user_id`, most recent first.
    ///
    /// A user with no messages gets an empty list. Names that can no longer be
    /// resolved are replaced by fallback labels rather than dropping the entry.
    pub async fn conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let messages = self.store.visible_messages_for(user_id).await?;

        let mut conversations: Vec<Conversation> = Vec::new();
        let mut slots: HashMap<(String, String), usize> = HashMap::new();

        for message in messages {
            let counterpart = message.counterpart_of(user_id).to_string();
            let unread = u64::from(message.receiver_id == user_id && !message.read);
            let key = (message.listing_id.clone(), counterpart.clone());

            if let Some(&slot) = slots.get(&key) {
                conversations[slot].unread_count += unread;
                continue;
            }

            slots.insert(key, conversations.len());
            conversations.push(Conversation {
                listing_id: message.listing_id,
                counterpart_id: counterpart,
                counterpart_name: String::new(),
                listing_name: String::new(),
                last_message: message.body,
                last_message_at: message.created_at,
                last_message_id: message.id,
                last_sender_id: message.sender_id,
                unread_count: unread,
            });
        }

        self.enrich(&mut conversations).await;

        debug!("Found {} conversations for {}", conversations.len(), user_id);
        Ok(conversations)
    }

    /// Fill in display names, resolving each user and listing once per call
    async fn enrich(&self, conversations: &mut [Conversation]) {
        let mut user_names: HashMap<String, String> = HashMap::new();
        let mut listing_names: HashMap<String, String> = HashMap::new();

        for conversation in conversations.iter_mut() {
            if !user_names.contains_key(&conversation.counterpart_id) {
                let name = self
                    .directory
                    .user_display_name(&conversation.counterpart_id)
                    .await
                    .unwrap_or_else(|| FALLBACK_USER_NAME.to_string());
                user_names.insert(conversation.counterpart_id.clone(), name);
            }
            if !listing_names.contains_key(&conversation.listing_id) {
                let name = self
                    .directory
                    .listing_name(&conversation.listing_id)
                    .await
                    .unwrap_or_else(|| FALLBACK_LISTING_NAME.to_string());
                listing_names.insert(conversation.listing_id.clone(), name);
            }

            conversation.counterpart_name = user_names[&conversation.counterpart_id].clone();
            conversation.listing_name = listing_names[&conversation.listing_id].clone();
        }
    }
}
