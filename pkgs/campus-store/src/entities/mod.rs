//! Sea-ORM entities for campus-store

pub mod chat_message_deletions;
pub mod chat_messages;

pub use chat_message_deletions::Entity as ChatMessageDeletion;
pub use chat_messages::Entity as ChatMessage;
