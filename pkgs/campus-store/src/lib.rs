//! Campus Store - persistent chat storage for Campus Rooms
//!
//! This crate provides SQLite-based persistence for listing chats using Sea-ORM,
//! together with the views derived from it.
//!
//! # Architecture
//!
//! - **MessageStore**: the message ledger. Appends, history reads, read marking
//!   and per-viewer soft deletion. It is the only component that mutates
//!   message records.
//! - **ConversationIndex**: groups a user's visible messages into conversations
//!   (one per listing and counterpart) with a last-message preview.
//! - **Directory**: lookup of display names for users and listings, owned by
//!   external collaborators. `StaticDirectory` is an in-memory implementation.
//!
//! # Database Schema
//!
//! - `chat_messages`: one row per message. The autoincrement id is the message
//!   id and grows with insertion order.
//! - `chat_message_deletions`: `(message_id, user_id)` pairs, the set of users
//!   that have hidden a message from their own view.
//!
//! There are no conversation or unread tables; both are derived at read time.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use campus_store::{MessageStore, PersistenceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MessageStore::with_config(PersistenceConfig {
//!     db_path: "campus-chat.db".into(),
//!     ..Default::default()
//! })
//! .await?;
//!
//! let msg = store
//!     .append("L42", "student-1", "landlord-7", "Is this room still available?")
//!     .await?;
//! let history = store.history("L42", "student-1", "landlord-7", "student-1").await?;
//! assert_eq!(history.last().map(|m| m.id), Some(msg.id));
//! # Ok(())
//! # }
//! ```

pub mod conversation_index;
pub mod directory;
pub mod entities;
pub mod error;
pub mod message_store;
pub mod migration;
pub mod models;

pub use conversation_index::ConversationIndex;
pub use directory::{Directory, StaticDirectory};
pub use error::StoreError;
pub use message_store::MessageStore;
pub use models::{Conversation, Message};

/// Display name used when a counterpart can no longer be resolved
pub const FALLBACK_USER_NAME: &str = "User";

/// Listing name used when a listing can no longer be resolved
pub const FALLBACK_LISTING_NAME: &str = "";

/// Configuration for the persistence layer
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Path to the SQLite database file
    pub db_path: std::path::PathBuf,

    /// Maximum message body length in characters (default: 2000)
    pub max_body_chars: usize,

    /// Maximum pooled database connections (default: 8)
    pub max_connections: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: std::path::PathBuf::from("campus-chat.db"),
            max_body_chars: 2000,
            max_connections: 8,
        }
    }
}
