//! Product entity.

use super::seller_profile::SellerType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub seller_id: String,

    pub category_id: String,

    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub price_cents: i64,

    /// Copy of the owning seller's type, rewritten on retype.
    #[sea_orm(nullable)]
    pub product_type: Option<SellerType>,

    /// Cleared on every content edit.
    #[sea_orm(default_value = false)]
    pub is_approved: bool,

    #[sea_orm(default_value = false)]
    pub is_deleted: bool,

    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seller_profile::Entity",
        from = "Column::SellerId",
        to = "super::seller_profile::Column::Id",
        on_delete = "Cascade"
    )]
    Seller,

    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Restrict"
    )]
    Category,

    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
}

impl Related<super::seller_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
