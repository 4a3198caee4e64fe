use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(super) enum ChatMessages {
    Table,
    Id,
    ListingId,
    SenderId,
    ReceiverId,
    Body,
    CreatedAt,
    Read,
    ReadAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000001_create_chat_messages_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMessages::ListingId).string().not_null())
                    .col(ColumnDef::new(ChatMessages::SenderId).string().not_null())
                    .col(ColumnDef::new(ChatMessages::ReceiverId).string().not_null())
                    .col(ColumnDef::new(ChatMessages::Body).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessages::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatMessages::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ChatMessages::ReadAt).big_integer())
                    .to_owned(),
            )
            .await?;

        // History lookups by listing and participant pair
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_messages_pair")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::ListingId)
                    .col(ChatMessages::SenderId)
                    .col(ChatMessages::ReceiverId)
                    .to_owned(),
            )
            .await?;

        // Unread counts
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_messages_receiver_read")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::ReceiverId)
                    .col(ChatMessages::Read)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_messages_created_at")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
            .await
    }
}
