//! Create order table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Order::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Order::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Order::BuyerId).string_len(32).not_null())
                    .col(ColumnDef::new(Order::SellerId).string_len(32).not_null())
                    .col(ColumnDef::new(Order::ProductId).string_len(32).not_null())
                    .col(ColumnDef::new(Order::BuyerAddress).text().not_null())
                    .col(ColumnDef::new(Order::BuyerPhone).string_len(32).not_null())
                    .col(ColumnDef::new(Order::BuyerNotes).text())
                    .col(
                        ColumnDef::new(Order::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Order::IsCancelled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Order::CancellationReason).string_len(16))
                    .col(
                        ColumnDef::new(Order::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Order::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_buyer")
                            .from(Order::Table, Order::BuyerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_seller")
                            .from(Order::Table, Order::SellerId)
                            .to(SellerProfile::Table, SellerProfile::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_product")
                            .from(Order::Table, Order::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (buyer_id, status) for buyer listings and ban cascades
        manager
            .create_index(
                Index::create()
                    .name("idx_order_buyer_status")
                    .table(Order::Table)
                    .col(Order::BuyerId)
                    .col(Order::Status)
                    .to_owned(),
            )
            .await?;

        // Index: (seller_id, status) for seller listings and removal cascades
        manager
            .create_index(
                Index::create()
                    .name("idx_order_seller_status")
                    .table(Order::Table)
                    .col(Order::SellerId)
                    .col(Order::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Order::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Order {
    Table,
    Id,
    BuyerId,
    SellerId,
    ProductId,
    BuyerAddress,
    BuyerPhone,
    BuyerNotes,
    Status,
    IsCancelled,
    CancellationReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum SellerProfile {
    Table,
    Id,
}

#[derive(Iden)]
enum Product {
    Table,
    Id,
}
