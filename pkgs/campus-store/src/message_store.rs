//! Message store - persistent storage for chat messages using SQLite
//!
//! The store is the single source of truth for messages. Every other view
//! (conversation list, unread counts) is derived from the rows kept here.
//!
//! # Ordering
//!
//! Timestamps are assigned by the store at append time and never go backwards
//! within a process, even if the wall clock does. History is returned sorted by
//! `(created_at, id)`, so two appends for the same pair are always read back in
//! the order they were persisted.
//!
//! # Soft deletion
//!
//! Deleting a conversation never removes rows. It records `(message_id, user_id)`
//! markers, and every viewer-scoped read filters out messages carrying a marker
//! for that viewer.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, instrument, warn};

use crate::entities::{chat_message_deletions, chat_messages};
use crate::error::StoreError;
use crate::models::Message;
use crate::PersistenceConfig;

/// Rows per statement when binding id lists, well under SQLite's variable limit
const BIND_CHUNK: usize = 300;

/// Message store - manages persistent message storage
pub struct MessageStore {
    pub(crate) db: DatabaseConnection,
    pub(crate) config: PersistenceConfig,
    last_timestamp: AtomicI64,
}

impl MessageStore {
    /// Create a new message store with default config
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        Self::with_config(PersistenceConfig {
            db_path,
            ..Default::default()
        })
        .await
    }

    /// Create a message store with custom config, running migrations
    pub async fn with_config(config: PersistenceConfig) -> Result<Self> {
        let db_path_str = config
            .db_path
            .to_str()
            .context("Invalid database path")?
            .replace("\\", "/");

        let db_url = format!("sqlite:{}?mode=rwc", db_path_str);

        let mut options = ConnectOptions::new(db_url);
        options
            .max_connections(config.max_connections)
            .sqlx_logging(false);

        let db: DatabaseConnection = Database::connect(options)
            .await
            .context("Failed to connect to database")?;

        crate::migration::Migrator::up(&db, None)
            .await
            .context("Failed to run migrations")?;

        info!("Message store initialized at {}", config.db_path.display());

        Ok(Self::with_connection(db, config).await)
    }

    /// Create a message store with an existing database connection.
    ///
    /// Migrations are expected to have been applied already.
    pub async fn with_connection(db: DatabaseConnection, config: PersistenceConfig) -> Self {
        let last = match Self::load_last_timestamp(&db).await {
            Ok(last) => last,
            Err(e) => {
                warn!("Could not read last message timestamp: {}", e);
                0
            }
        };

        Self {
            db,
            config,
            last_timestamp: AtomicI64::new(last),
        }
    }

    async fn load_last_timestamp(db: &DatabaseConnection) -> std::result::Result<i64, StoreError> {
        let latest = chat_messages::Entity::find()
            .order_by_desc(chat_messages::Column::CreatedAt)
            .one(db)
            .await?;

        Ok(latest.map(|m| m.created_at).unwrap_or(0))
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Check a message before it is persisted
    pub fn validate(
        &self,
        listing_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> std::result::Result<(), StoreError> {
        if listing_id.trim().is_empty() {
            return Err(StoreError::MissingField("listingId"));
        }
        if sender_id.trim().is_empty() {
            return Err(StoreError::MissingField("sender"));
        }
        if receiver_id.trim().is_empty() {
            return Err(StoreError::MissingField("receiver"));
        }
        if sender_id == receiver_id {
            return Err(StoreError::InvalidParticipants);
        }
        if body.trim().is_empty() {
            return Err(StoreError::EmptyBody);
        }

        let len = body.chars().count();
        if len > self.config.max_body_chars {
            return Err(StoreError::BodyTooLong {
                len,
                max: self.config.max_body_chars,
            });
        }

        Ok(())
    }

    /// Validate and persist a new message, assigning its id and timestamp
    #[instrument(skip(self, body))]
    pub async fn append(
        &self,
        listing_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> std::result::Result<Message, StoreError> {
        self.validate(listing_id, sender_id, receiver_id, body)?;

        let created_at = self.next_timestamp();

        let model = chat_messages::ActiveModel {
            listing_id: Set(listing_id.to_string()),
            sender_id: Set(sender_id.to_string()),
            receiver_id: Set(receiver_id.to_string()),
            body: Set(body.to_string()),
            created_at: Set(created_at),
            read: Set(false),
            read_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        debug!("Stored message {} in listing {}", model.id, listing_id);
        Ok(Message::from_model(model, HashSet::new()))
    }

    /// All messages between two users about one listing, oldest first,
    /// excluding those `viewer_id` has deleted
    pub async fn history(
        &self,
        listing_id: &str,
        user_a: &str,
        user_b: &str,
        viewer_id: &str,
    ) -> std::result::Result<Vec<Message>, StoreError> {
        let models = chat_messages::Entity::find()
            .filter(pair_condition(listing_id, user_a, user_b))
            .filter(not_deleted_for(viewer_id))
            .order_by_asc(chat_messages::Column::CreatedAt)
            .order_by_asc(chat_messages::Column::Id)
            .all(&self.db)
            .await?;

        debug!(
            "Retrieved {} messages for listing {} ({} <-> {})",
            models.len(),
            listing_id,
            user_a,
            user_b
        );
        self.attach_deletions(models).await
    }

    /// Mark every unread message from `sender_id` to `receiver_id` in the
    /// listing as read. Returns the number of messages that changed.
    pub async fn mark_read(
        &self,
        listing_id: &str,
        sender_id: &str,
        receiver_id: &str,
    ) -> std::result::Result<u64, StoreError> {
        let now = Utc::now().timestamp_millis();

        let result = chat_messages::Entity::update_many()
            .col_expr(chat_messages::Column::Read, Expr::value(true))
            .col_expr(chat_messages::Column::ReadAt, Expr::value(now))
            .filter(chat_messages::Column::ListingId.eq(listing_id))
            .filter(chat_messages::Column::SenderId.eq(sender_id))
            .filter(chat_messages::Column::ReceiverId.eq(receiver_id))
            .filter(chat_messages::Column::Read.eq(false))
            .exec(&self.db)
            .await?;

        debug!(
            "Marked {} messages from {} to {} as read",
            result.rows_affected, sender_id, receiver_id
        );
        Ok(result.rows_affected)
    }

    /// Hide every message of the pair from `viewer_id`.
    ///
    /// Idempotent: messages already hidden for the viewer are skipped. Returns
    /// the number of newly hidden messages.
    #[instrument(skip(self))]
    pub async fn mark_deleted_for_user(
        &self,
        listing_id: &str,
        user_a: &str,
        user_b: &str,
        viewer_id: &str,
    ) -> std::result::Result<u64, StoreError> {
        if viewer_id != user_a && viewer_id != user_b {
            warn!("Viewer {} is not a participant, nothing to delete", viewer_id);
            return Ok(0);
        }

        let now = Utc::now().timestamp_millis();

        // One INSERT .. SELECT so SQLite takes the write lock up front
        let hidden_rows = Query::select()
            .column(chat_messages::Column::Id)
            .expr(Expr::val(viewer_id.to_string()))
            .expr(Expr::val(now))
            .from(chat_messages::Entity)
            .cond_where(pair_condition(listing_id, user_a, user_b))
            .and_where(not_deleted_for(viewer_id))
            .to_owned();

        let insert = Query::insert()
            .into_table(chat_message_deletions::Entity)
            .columns([
                chat_message_deletions::Column::MessageId,
                chat_message_deletions::Column::UserId,
                chat_message_deletions::Column::DeletedAt,
            ])
            .select_from(hidden_rows)
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .on_conflict(
                OnConflict::columns([
                    chat_message_deletions::Column::MessageId,
                    chat_message_deletions::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .to_owned();

        let backend = self.db.get_database_backend();
        let hidden = self.db.execute(backend.build(&insert)).await?.rows_affected();

        info!(
            "Hid {} messages in listing {} for {}",
            hidden, listing_id, viewer_id
        );
        Ok(hidden)
    }

    /// Unread messages addressed to `user_id` that the user has not deleted
    pub async fn unread_count(&self, user_id: &str) -> std::result::Result<u64, StoreError> {
        let count = chat_messages::Entity::find()
            .filter(chat_messages::Column::ReceiverId.eq(user_id))
            .filter(chat_messages::Column::Read.eq(false))
            .filter(not_deleted_for(user_id))
            .count(&self.db)
            .await?;

        debug!("Unread messages for {}: {}", user_id, count);
        Ok(count)
    }

    /// Unread messages from `counterpart_id` to `user_id` in one listing
    pub async fn unread_count_in_conversation(
        &self,
        listing_id: &str,
        user_id: &str,
        counterpart_id: &str,
    ) -> std::result::Result<u64, StoreError> {
        let count = chat_messages::Entity::find()
            .filter(chat_messages::Column::ListingId.eq(listing_id))
            .filter(chat_messages::Column::SenderId.eq(counterpart_id))
            .filter(chat_messages::Column::ReceiverId.eq(user_id))
            .filter(chat_messages::Column::Read.eq(false))
            .filter(not_deleted_for(user_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    /// Every message `user_id` sent or received and still sees, newest first
    pub async fn visible_messages_for(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<Message>, StoreError> {
        let models = chat_messages::Entity::find()
            .filter(
                Condition::any()
                    .add(chat_messages::Column::SenderId.eq(user_id))
                    .add(chat_messages::Column::ReceiverId.eq(user_id)),
            )
            .filter(not_deleted_for(user_id))
            .order_by_desc(chat_messages::Column::CreatedAt)
            .order_by_desc(chat_messages::Column::Id)
            .all(&self.db)
            .await?;

        self.attach_deletions(models).await
    }

    /// Get message by ID
    pub async fn get_message(&self, id: i64) -> std::result::Result<Option<Message>, StoreError> {
        let model = chat_messages::Entity::find_by_id(id).one(&self.db).await?;

        match model {
            Some(model) => Ok(self.attach_deletions(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Total number of stored messages
    pub async fn total_messages(&self) -> std::result::Result<u64, StoreError> {
        Ok(chat_messages::Entity::find().count(&self.db).await?)
    }

    /// The most recently stored messages across all conversations
    pub async fn recent_messages(
        &self,
        limit: u64,
    ) -> std::result::Result<Vec<Message>, StoreError> {
        let models = chat_messages::Entity::find()
            .order_by_desc(chat_messages::Column::CreatedAt)
            .order_by_desc(chat_messages::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        self.attach_deletions(models).await
    }

    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        now.max(previous)
    }

    /// Load the deletion sets for a batch of rows
    async fn attach_deletions(
        &self,
        models: Vec<chat_messages::Model>,
    ) -> std::result::Result<Vec<Message>, StoreError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut deleted: HashMap<i64, HashSet<String>> = HashMap::new();

        for chunk in ids.chunks(BIND_CHUNK) {
            let rows = chat_message_deletions::Entity::find()
                .filter(chat_message_deletions::Column::MessageId.is_in(chunk.to_vec()))
                .all(&self.db)
                .await?;

            for row in rows {
                deleted.entry(row.message_id).or_default().insert(row.user_id);
            }
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let deleted_by = deleted.remove(&model.id).unwrap_or_default();
                Message::from_model(model, deleted_by)
            })
            .collect())
    }
}

/// Messages in either direction between two users about one listing
fn pair_condition(listing_id: &str, user_a: &str, user_b: &str) -> Condition {
    Condition::all()
        .add(chat_messages::Column::ListingId.eq(listing_id))
        .add(
            Condition::any()
                .add(
                    Condition::all()
                        .add(chat_messages::Column::SenderId.eq(user_a))
                        .add(chat_messages::Column::ReceiverId.eq(user_b)),
                )
                .add(
                    Condition::all()
                        .add(chat_messages::Column::SenderId.eq(user_b))
                        .add(chat_messages::Column::ReceiverId.eq(user_a)),
                ),
        )
}

/// Excludes messages carrying a deletion marker for `viewer_id`
fn not_deleted_for(viewer_id: &str) -> SimpleExpr {
    chat_messages::Column::Id.not_in_subquery(
        Query::select()
            .column(chat_message_deletions::Column::MessageId)
            .from(chat_message_deletions::Entity)
            .and_where(chat_message_deletions::Column::UserId.eq(viewer_id))
            .to_owned(),
    )
}
