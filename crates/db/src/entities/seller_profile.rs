//! Seller profile entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of seller. Products mirror it in `product_type`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellerType {
    #[sea_orm(string_value = "OFFICIAL")]
    Official,
    #[sea_orm(string_value = "FAN_MADE")]
    FanMade,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning user (one profile per user)
    #[sea_orm(unique)]
    pub user_id: String,

    pub business_name: String,

    #[sea_orm(column_type = "Text")]
    pub business_description: String,

    /// Accepted payment methods (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub payment_methods: Json,

    pub average_shipping_cost_cents: i64,

    pub estimated_delivery_days: i32,

    #[sea_orm(column_type = "Text")]
    pub shipping_regions: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub social_links: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_approved: bool,

    /// NULL until the profile is approved
    #[sea_orm(nullable)]
    pub seller_type: Option<SellerType>,

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
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::product::Entity")]
    Products,

    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
