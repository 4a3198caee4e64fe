//! Session handles for live connections
//!
//! A session is one connected client. Its handle owns the sending half of a
//! bounded queue; the connection task drains the other half and writes frames
//! to the socket. Handing an event to a session never blocks: a full queue
//! drops the event for that session only.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::events::ServerEvent;

/// Unique id of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cloneable handle used by the registry and broker to reach a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    user_id: Arc<str>,
    tx: mpsc::Sender<ServerEvent>,
}

impl SessionHandle {
    /// Create a handle and the receiver its connection task drains
    pub fn new(user_id: &str, capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: SessionId::new(),
            user_id: Arc::from(user_id),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Authenticated identity this session acts as
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Queue an event without waiting
    pub fn dispatch(&self, event: ServerEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::Stale,
        })
    }

    /// Whether the connection task has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
