//! Create product and product image tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Product::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Product::SellerId).string_len(32).not_null())
                    .col(ColumnDef::new(Product::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(Product::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Product::Description).text().not_null())
                    .col(ColumnDef::new(Product::PriceCents).big_integer().not_null())
                    .col(ColumnDef::new(Product::ProductType).string_len(16))
                    .col(
                        ColumnDef::new(Product::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Product::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Product::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Product::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Product::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_seller")
                            .from(Product::Table, Product::SellerId)
                            .to(SellerProfile::Table, SellerProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category")
                            .from(Product::Table, Product::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: seller_id (seller listings and cascades)
        manager
            .create_index(
                Index::create()
                    .name("idx_product_seller_id")
                    .table(Product::Table)
                    .col(Product::SellerId)
                    .to_owned(),
            )
            .await?;

        // Index: (is_approved, is_deleted) for public listing and review queue
        manager
            .create_index(
                Index::create()
                    .name("idx_product_visibility")
                    .table(Product::Table)
                    .col(Product::IsApproved)
                    .col(Product::IsDeleted)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductImage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductImage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductImage::ProductId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductImage::Url).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(ProductImage::PublicId)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductImage::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_image_product")
                            .from(ProductImage::Table, ProductImage::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_image_product_id")
                    .table(ProductImage::Table)
                    .col(ProductImage::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductImage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Product {
    Table,
    Id,
    SellerId,
    CategoryId,
    Name,
    Description,
    PriceCents,
    ProductType,
    IsApproved,
    IsDeleted,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProductImage {
    Table,
    Id,
    ProductId,
    Url,
    PublicId,
    Position,
}

#[derive(Iden)]
enum SellerProfile {
    Table,
    Id,
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
}
