//! Campus Chat - live messaging core for Campus Rooms
//!
//! Sits on top of `campus-store` and adds everything that only exists while
//! the process runs: rooms, sessions and delivery.
//!
//! # Components
//!
//! - **RoomRegistry**: listing and personal rooms mapped to live session handles
//! - **DeliveryBroker**: persist-then-fan-out for every new message
//! - **UnreadTracker**: cached unread counts derived from the store
//! - **SoftDeleteLedger**: per-user conversation hiding
//! - **ChatService**: facade used by the live channel and request handlers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use campus_chat::{ChatConfig, ChatService, ClientEvent};
//! use campus_store::{MessageStore, StaticDirectory};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(MessageStore::new("campus-chat.db".into()).await?);
//! let service = ChatService::new(store, Arc::new(StaticDirectory::new()), ChatConfig::default());
//!
//! let (session, mut events) = service.connect("landlord-7");
//! service
//!     .handle_client_event(
//!         &session,
//!         ClientEvent::JoinRoom {
//!             listing_id: Some("L42".into()),
//!             user_id: Some("landlord-7".into()),
//!         },
//!     )
//!     .await;
//!
//! service.send("L42", "student-1", "landlord-7", "Still available?").await?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_json()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod events;
pub mod room_registry;
pub mod service;
pub mod session;
pub mod soft_delete;
pub mod unread_tracker;

pub use broker::{DeliveryBroker, DeliveryReport};
pub use config::ChatConfig;
pub use error::{ChatError, DispatchError};
pub use events::{ClientEvent, ServerEvent};
pub use room_registry::{RoomKey, RoomRegistry};
pub use service::ChatService;
pub use session::{SessionHandle, SessionId};
pub use soft_delete::SoftDeleteLedger;
pub use unread_tracker::UnreadTracker;
