//! Ticket store, owned by users

use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(uuid(Tickets::Id).primary_key())
                    .col(string_len(Tickets::Subject, 255).not_null())
                    .col(string_len(Tickets::Entity, 255).not_null())
                    .col(
                        string_len(Tickets::Location, 255)
                            .not_null()
                            .default("my city"),
                    )
                    .col(string_len(Tickets::Status, 32).not_null().default("open"))
                    .col(
                        string_len(Tickets::Priority, 32)
                            .not_null()
                            .default("high-priority"),
                    )
                    .col(
                        string_len(Tickets::Category, 32)
                            .not_null()
                            .default("maintenance"),
                    )
                    .col(uuid(Tickets::OwnerId).not_null())
                    .col(
                        timestamp_with_time_zone(Tickets::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Tickets::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Deleting a user that still owns tickets fails
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_owner_id")
                            .from(Tickets::Table, Tickets::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::NoAction)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_owner_created")
                    .table(Tickets::Table)
                    .col(Tickets::OwnerId)
                    .col(Tickets::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_status")
                    .table(Tickets::Table)
                    .col(Tickets::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    Subject,
    Entity,
    Location,
    Status,
    Priority,
    Category,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}
