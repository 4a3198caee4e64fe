//! Delivery broker - persists a message, then fans it out
//!
//! A message moves through `Validated -> Persisted -> Fanned-out`. Nothing is
//! broadcast until the store has accepted the message, and no lock is held
//! while the store call is in flight.

use std::collections::HashSet;
use std::sync::Arc;

use campus_store::{Message, MessageStore};
use tracing::{debug, info, instrument, warn};

use crate::error::{ChatError, DispatchError};
use crate::events::ServerEvent;
use crate::room_registry::{RoomKey, RoomRegistry};
use crate::session::SessionHandle;
use crate::unread_tracker::UnreadTracker;

/// Outcome of one fan-out
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub message: Message,
    /// Sessions that accepted the event
    pub delivered: usize,
    /// Sessions whose outbound queue was full
    pub dropped: usize,
    /// Sessions that disconnected before the event reached them
    pub stale: usize,
}

pub struct DeliveryBroker {
    store: Arc<MessageStore>,
    registry: Arc<RoomRegistry>,
    unread: Arc<UnreadTracker>,
}

impl DeliveryBroker {
    pub fn new(
        store: Arc<MessageStore>,
        registry: Arc<RoomRegistry>,
        unread: Arc<UnreadTracker>,
    ) -> Self {
        Self {
            store,
            registry,
            unread,
        }
    }

    /// Persist and deliver a message
    ///
    /// # Steps
    ///
    /// 1. Validate and append through the message store
    /// 2. Invalidate the receiver's unread count
    /// 3. Snapshot the listing room and the receiver's personal room
    /// 4. Queue a `messageDelivered` event on every distinct session
    ///
    /// Validation and storage failures are returned to the caller only; no
    /// session sees anything in that case.
    #[instrument(skip(self, body))]
    pub async fn send(
        &self,
        listing_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<DeliveryReport, ChatError> {
        let message = self
            .store
            .append(listing_id, sender_id, receiver_id, body)
            .await
            .map_err(|e| {
                warn!("Rejected message from {}: {}", sender_id, e);
                ChatError::from(e)
            })?;

        self.unread.invalidate(receiver_id);

        let targets = self.targets(listing_id, receiver_id);
        let mut report = DeliveryReport {
            message,
            delivered: 0,
            dropped: 0,
            stale: 0,
        };

        for session in targets {
            let event = ServerEvent::MessageDelivered {
                message: report.message.clone(),
            };
            match session.dispatch(event) {
                Ok(()) => report.delivered += 1,
                Err(DispatchError::QueueFull) => {
                    warn!(
                        "Outbound queue full for session {}, dropping message {}",
                        session.id(),
                        report.message.id
                    );
                    report.dropped += 1;
                }
                Err(DispatchError::Stale) => {
                    debug!("Skipping stale session {}", session.id());
                    self.registry.leave_all(session.id());
                    report.stale += 1;
                }
            }
        }

        info!(
            "Message {} delivered to {} sessions ({} dropped, {} stale)",
            report.message.id, report.delivered, report.dropped, report.stale
        );
        Ok(report)
    }

    /// Distinct sessions in the listing room and the receiver's personal room
    fn targets(&self, listing_id: &str, receiver_id: &str) -> Vec<SessionHandle> {
        let mut seen = HashSet::new();
        self.registry
            .members_of(&RoomKey::listing(listing_id))
            .into_iter()
            .chain(self.registry.members_of(&RoomKey::personal(receiver_id)))
            .filter(|session| seen.insert(session.id()))
            .collect()
    }
}
