//! Create seller profile table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SellerProfile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SellerProfile::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::UserId)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::BusinessName)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::BusinessDescription)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::PaymentMethods)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::AverageShippingCostCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::EstimatedDeliveryDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SellerProfile::ShippingRegions)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SellerProfile::SocialLinks).text())
                    .col(
                        ColumnDef::new(SellerProfile::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SellerProfile::SellerType).string_len(16))
                    .col(
                        ColumnDef::new(SellerProfile::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SellerProfile::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(SellerProfile::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SellerProfile::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seller_profile_user")
                            .from(SellerProfile::Table, SellerProfile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (is_approved, is_deleted) for the pending applications queue
        manager
            .create_index(
                Index::create()
                    .name("idx_seller_profile_approval")
                    .table(SellerProfile::Table)
                    .col(SellerProfile::IsApproved)
                    .col(SellerProfile::IsDeleted)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SellerProfile::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SellerProfile {
    Table,
    Id,
    UserId,
    BusinessName,
    BusinessDescription,
    PaymentMethods,
    AverageShippingCostCents,
    EstimatedDeliveryDays,
    ShippingRegions,
    SocialLinks,
    IsApproved,
    SellerType,
    IsDeleted,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
