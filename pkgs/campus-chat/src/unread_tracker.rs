//! Unread tracker - per-user unread counts
//!
//! The count is always derived from the message store. Only users with a
//! cached count have an entry; invalidating drops it. Every invalidation bumps
//! a shared epoch, and a computed count is only cached if the epoch did not
//! move while it was being computed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use campus_store::MessageStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::ChatError;

/// Upper bound on cached users; past it counts are computed but not kept
const MAX_CACHED_USERS: usize = 10_000;

pub struct UnreadTracker {
    store: Arc<MessageStore>,
    counts: DashMap<String, u64>,
    epoch: AtomicU64,
}

impl UnreadTracker {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self {
            store,
            counts: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Unread, not-deleted messages addressed to `user_id`
    pub async fn count_for(&self, user_id: &str) -> Result<u64, ChatError> {
        if let Some(count) = self.counts.get(user_id) {
            return Ok(*count);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let count = self.store.unread_count(user_id).await?;

        if self.counts.len() < MAX_CACHED_USERS {
            // The epoch is checked under the shard lock, so an invalidation
            // racing with this insert removes the entry right after it
            if let Entry::Vacant(slot) = self.counts.entry(user_id.to_string()) {
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    slot.insert(count);
                }
            }
        }

        Ok(count)
    }

    /// Drop the cached count for a user
    pub fn invalidate(&self, user_id: &str) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.counts.remove(user_id);
        debug!("Invalidated unread count for {}", user_id);
    }

    /// Mark the counterpart's messages to `user_id` in a listing as read.
    /// Returns how many messages changed.
    pub async fn reset_on_open(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<u64, ChatError> {
        let changed = self
            .store
            .mark_read(listing_id, counterpart_id, user_id)
            .await?;
        self.invalidate(user_id);
        Ok(changed)
    }

    #[cfg(test)]
    fn cached(&self, user_id: &str) -> Option<u64> {
        self.counts.get(user_id).map(|count| *count)
    }
}
