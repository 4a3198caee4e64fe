//! Soft-delete ledger - per-user conversation hiding

use std::sync::Arc;

use campus_store::MessageStore;
use tracing::info;

use crate::error::ChatError;
use crate::unread_tracker::UnreadTracker;

pub struct SoftDeleteLedger {
    store: Arc<MessageStore>,
    unread: Arc<UnreadTracker>,
}

impl SoftDeleteLedger {
    pub fn new(store: Arc<MessageStore>, unread: Arc<UnreadTracker>) -> Self {
        Self { store, unread }
    }

    /// Hide the conversation with `counterpart_id` in a listing from `user_id`.
    ///
    /// Repeating the call is a no-op. The counterpart's view is untouched.
    /// Returns the number of newly hidden messages.
    pub async fn delete(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<u64, ChatError> {
        let hidden = self
            .store
            .mark_deleted_for_user(listing_id, user_id, counterpart_id, user_id)
            .await?;

        // Hidden messages no longer count as unread
        self.unread.invalidate(user_id);

        info!(
            "User {} deleted conversation with {} on listing {}",
            user_id, counterpart_id, listing_id
        );
        Ok(hidden)
    }
}
