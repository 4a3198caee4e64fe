//! Chat message entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub listing_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub created_at: i64, // Unix millis, server-assigned
    pub read: bool,
    pub read_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chat_message_deletions::Entity")]
    Deletions,
}

impl Related<super::chat_message_deletions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deletions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
