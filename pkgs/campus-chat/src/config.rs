//! Limits and timings for the live chat layer

use std::time::Duration;

/// Configuration for rooms, sessions and heartbeats
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Maximum rooms a single session may be joined to (default: 16)
    pub max_rooms_per_session: usize,

    /// Maximum sessions in one room (default: 512)
    pub max_sessions_per_room: usize,

    /// Bounded outbound queue per session (default: 64)
    pub outbound_queue_capacity: usize,

    /// Interval between server pings (default: 20s)
    pub heartbeat_interval: Duration,

    /// Close a session after this long without an inbound frame (default: 60s)
    pub idle_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_rooms_per_session: 16,
            max_sessions_per_room: 512,
            outbound_queue_capacity: 64,
            heartbeat_interval: Duration::from_secs(20),
            idle_timeout: Duration::from_secs(60),
        }
    }
}
