use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_chat_messages_table::ChatMessages;

#[derive(DeriveIden)]
enum ChatMessageDeletions {
    Table,
    MessageId,
    UserId,
    DeletedAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000002_create_chat_message_deletions_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatMessageDeletions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessageDeletions::MessageId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatMessageDeletions::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatMessageDeletions::DeletedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ChatMessageDeletions::MessageId)
                            .col(ChatMessageDeletions::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_deletions_message")
                            .from(ChatMessageDeletions::Table, ChatMessageDeletions::MessageId)
                            .to(ChatMessages::Table, ChatMessages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_message_deletions_user")
                    .table(ChatMessageDeletions::Table)
                    .col(ChatMessageDeletions::UserId)
                    .col(ChatMessageDeletions::MessageId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessageDeletions::Table).to_owned())
            .await
    }
}
