//! Chat service - the entry point used by connection and request handlers
//!
//! Owns one instance of each component and wires them together. The registry
//! is created here and shared by handle, never through a global.

use std::sync::Arc;

use campus_store::{Conversation, ConversationIndex, Directory, Message, MessageStore};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::broker::{DeliveryBroker, DeliveryReport};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::events::{ClientEvent, ServerEvent};
use crate::room_registry::{RoomKey, RoomRegistry};
use crate::session::SessionHandle;
use crate::soft_delete::SoftDeleteLedger;
use crate::unread_tracker::UnreadTracker;

pub struct ChatService {
    config: ChatConfig,
    store: Arc<MessageStore>,
    registry: Arc<RoomRegistry>,
    index: ConversationIndex,
    unread: Arc<UnreadTracker>,
    ledger: SoftDeleteLedger,
    broker: DeliveryBroker,
}

impl ChatService {
    pub fn new(
        store: Arc<MessageStore>,
        directory: Arc<dyn Directory>,
        config: ChatConfig,
    ) -> Self {
        let registry = Arc::new(RoomRegistry::new(&config));
        let unread = Arc::new(UnreadTracker::new(store.clone()));

        Self {
            index: ConversationIndex::new(store.clone(), directory),
            ledger: SoftDeleteLedger::new(store.clone(), unread.clone()),
            broker: DeliveryBroker::new(store.clone(), registry.clone(), unread.clone()),
            config,
            store,
            registry,
            unread,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Open a session for an authenticated user
    pub fn connect(&self, user_id: &str) -> (SessionHandle, mpsc::Receiver<ServerEvent>) {
        let (session, rx) = SessionHandle::new(user_id, self.config.outbound_queue_capacity);
        info!("Session {} opened for {}", session.id(), user_id);
        (session, rx)
    }

    /// Remove a session from every room
    pub fn disconnect(&self, session: &SessionHandle) -> Vec<RoomKey> {
        let rooms = self.registry.leave_all(session.id());
        info!(
            "Session {} closed for {}, left {} rooms",
            session.id(),
            session.user_id(),
            rooms.len()
        );
        rooms
    }

    /// Handle one event from a live session. Replies go to that session only.
    #[instrument(skip(self, session, event), fields(session = %session.id(), user = %session.user_id()))]
    pub async fn handle_client_event(&self, session: &SessionHandle, event: ClientEvent) {
        let reply = match event {
            ClientEvent::JoinRoom {
                listing_id,
                user_id,
            } => match self.join(session, listing_id, user_id) {
                Ok(rooms) => ServerEvent::Joined { rooms },
                Err(e) => error_event(&e),
            },
            ClientEvent::LeaveRoom {
                listing_id,
                user_id,
            } => {
                let rooms = room_keys(listing_id, user_id)
                    .into_iter()
                    .filter(|room| self.registry.leave(room, session.id()))
                    .map(|room| room.to_string())
                    .collect();
                ServerEvent::Left { rooms }
            }
            ClientEvent::ChatMessage {
                listing_id,
                receiver,
                body,
                sender,
                client_ref,
            } => {
                if let Some(sender) = sender.filter(|s| s != session.user_id()) {
                    let err = ChatError::Forbidden(format!("cannot send as {}", sender));
                    ServerEvent::SendFailed {
                        client_ref,
                        code: err.code().to_string(),
                        error: err.to_string(),
                    }
                } else {
                    match self
                        .broker
                        .send(&listing_id, session.user_id(), &receiver, &body)
                        .await
                    {
                        Ok(report) => ServerEvent::MessageSent {
                            client_ref,
                            message: report.message,
                        },
                        Err(e) => ServerEvent::SendFailed {
                            client_ref,
                            code: e.code().to_string(),
                            error: e.to_string(),
                        },
                    }
                }
            }
            ClientEvent::Ping => ServerEvent::Pong,
        };

        if let Err(e) = session.dispatch(reply) {
            debug!("Could not reply to session {}: {}", session.id(), e);
        }
    }

    fn join(
        &self,
        session: &SessionHandle,
        listing_id: Option<String>,
        user_id: Option<String>,
    ) -> Result<Vec<String>, ChatError> {
        if let Some(user_id) = user_id.as_deref() {
            if user_id != session.user_id() {
                return Err(ChatError::Forbidden(format!(
                    "cannot join personal room of {}",
                    user_id
                )));
            }
        }

        let mut joined = Vec::new();
        let mut added = Vec::new();
        for room in room_keys(listing_id, user_id) {
            match self.registry.join(room.clone(), session) {
                Ok(true) => added.push(room.clone()),
                Ok(false) => {}
                Err(e) => {
                    // All or nothing: undo the rooms this request added
                    for room in &added {
                        self.registry.leave(room, session.id());
                    }
                    return Err(e);
                }
            }
            joined.push(room.to_string());
        }
        Ok(joined)
    }

    /// Persist and fan out a message on behalf of `sender_id`
    pub async fn send(
        &self,
        listing_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<DeliveryReport, ChatError> {
        self.broker.send(listing_id, sender_id, receiver_id, body).await
    }

    /// The user's conversations, most recent first
    pub async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError> {
        Ok(self.index.conversations_for(user_id).await?)
    }

    /// Messages with `counterpart_id` in a listing, as `user_id` sees them.
    /// Does not change read state.
    pub async fn history(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<Vec<Message>, ChatError> {
        Ok(self
            .store
            .history(listing_id, user_id, counterpart_id, user_id)
            .await?)
    }

    /// Mark incoming messages read, then return the history
    pub async fn open_conversation(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<Vec<Message>, ChatError> {
        self.mark_read(listing_id, user_id, counterpart_id).await?;
        self.history(listing_id, user_id, counterpart_id).await
    }

    /// Mark messages from `counterpart_id` to `user_id` as read
    pub async fn mark_read(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<u64, ChatError> {
        self.unread
            .reset_on_open(listing_id, user_id, counterpart_id)
            .await
    }

    /// Hide a conversation from `user_id`
    pub async fn delete_conversation(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<u64, ChatError> {
        self.ledger.delete(listing_id, user_id, counterpart_id).await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64, ChatError> {
        self.unread.count_for(user_id).await
    }
}

fn room_keys(listing_id: Option<String>, user_id: Option<String>) -> Vec<RoomKey> {
    let mut rooms = Vec::new();
    if let Some(listing_id) = listing_id.filter(|id| !id.is_empty()) {
        rooms.push(RoomKey::Listing(listing_id));
    }
    if let Some(user_id) = user_id.filter(|id| !id.is_empty()) {
        rooms.push(RoomKey::Personal(user_id));
    }
    rooms
}

fn error_event(err: &ChatError) -> ServerEvent {
    warn!("Rejected request: {}", err);
    ServerEvent::Error {
        code: err.code().to_string(),
        error: err.to_string(),
    }
}
