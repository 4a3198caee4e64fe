//! Room registry - live room membership for fan-out
//!
//! Rooms are in-memory groups of session handles:
//! - a listing room per listing id, shared by every session with that chat open
//! - a personal room per user id, used for notifications on any page
//!
//! The registry keeps a reverse index from session to joined rooms so that a
//! disconnect only touches the rooms that session was in. Both maps are
//! sharded (`DashMap`), so unrelated rooms never contend on one lock. No
//! operation holds a reference into one map while locking the other.

use std::collections::{HashMap, HashSet};
use std::fmt;

use dashmap::DashMap;
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::session::{SessionHandle, SessionId};

/// Key of a room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Everyone viewing or chatting about a listing
    Listing(String),
    /// Notifications for one user
    Personal(String),
}

impl RoomKey {
    pub fn listing(listing_id: impl Into<String>) -> Self {
        RoomKey::Listing(listing_id.into())
    }

    pub fn personal(user_id: impl Into<String>) -> Self {
        RoomKey::Personal(user_id.into())
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Listing(id) => write!(f, "{}", id),
            RoomKey::Personal(id) => write!(f, "user_{}", id),
        }
    }
}

/// Room membership table
pub struct RoomRegistry {
    rooms: DashMap<RoomKey, HashMap<SessionId, SessionHandle>>,
    memberships: DashMap<SessionId, HashSet<RoomKey>>,
    max_rooms_per_session: usize,
    max_sessions_per_room: usize,
}

impl RoomRegistry {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            memberships: DashMap::new(),
            max_rooms_per_session: config.max_rooms_per_session,
            max_sessions_per_room: config.max_sessions_per_room,
        }
    }

    /// Add a session to a room.
    ///
    /// Returns `Ok(false)` when the session was already a member. Fails with
    /// `RoomLimit` when either the session or the room is full.
    pub fn join(&self, room: RoomKey, session: &SessionHandle) -> Result<bool, ChatError> {
        let session_id = session.id();

        if let Some(joined) = self.memberships.get(&session_id) {
            if joined.contains(&room) {
                return Ok(false);
            }
            if joined.len() >= self.max_rooms_per_session {
                return Err(session_full(joined.len()));
            }
        }

        let room_full = {
            let mut members = self.rooms.entry(room.clone()).or_default();
            if members.len() >= self.max_sessions_per_room {
                true
            } else {
                members.insert(session_id, session.clone());
                false
            }
        };

        if room_full {
            self.rooms.remove_if(&room, |_, members| members.is_empty());
            return Err(ChatError::RoomLimit(format!("room {} is full", room)));
        }

        // Reverse entry last: every room holding the session stays reachable
        // from `memberships`, even with a concurrent `leave_all`
        let over_limit = {
            let mut joined = self.memberships.entry(session_id).or_default();
            if joined.len() >= self.max_rooms_per_session {
                Some(joined.len())
            } else {
                joined.insert(room.clone());
                None
            }
        };

        if let Some(count) = over_limit {
            self.remove_member(&room, session_id);
            self.memberships.remove_if(&session_id, |_, joined| joined.is_empty());
            return Err(session_full(count));
        }

        debug!("Session {} joined room {}", session_id, room);
        Ok(true)
    }

    /// Remove a session from one room. Returns whether it was a member.
    pub fn leave(&self, room: &RoomKey, session_id: SessionId) -> bool {
        let removed = match self.memberships.get_mut(&session_id) {
            Some(mut joined) => joined.remove(room),
            None => false,
        };
        self.memberships.remove_if(&session_id, |_, joined| joined.is_empty());

        if removed {
            self.remove_member(room, session_id);
            debug!("Session {} left room {}", session_id, room);
        }
        removed
    }

    /// Remove a session from every room it joined, returning those rooms
    pub fn leave_all(&self, session_id: SessionId) -> Vec<RoomKey> {
        let Some((_, joined)) = self.memberships.remove(&session_id) else {
            return Vec::new();
        };

        for room in &joined {
            self.remove_member(room, session_id);
        }

        debug!("Session {} left {} rooms", session_id, joined.len());
        joined.into_iter().collect()
    }

    /// Snapshot of the sessions in a room
    pub fn members_of(&self, room: &RoomKey) -> Vec<SessionHandle> {
        self.rooms
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Rooms a session is currently in
    pub fn rooms_of(&self, session_id: SessionId) -> Vec<RoomKey> {
        self.memberships
            .get(&session_id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of non-empty rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of sessions joined to at least one room
    pub fn session_count(&self) -> usize {
        self.memberships.len()
    }

    fn remove_member(&self, room: &RoomKey, session_id: SessionId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&session_id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }
}

fn session_full(count: usize) -> ChatError {
    ChatError::RoomLimit(format!("session already in {} rooms", count))
}
