//! `PostgreSQL` store backed by sea-orm.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fanforge_common::{AppError, AppResult};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, SqlErr, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use tracing::debug;

use super::{EntityStore, StoreTransaction};
use crate::entities::{
    CancellationReason, Category, Order, OrderStatus, Product, ProductImage, SellerProfile, User,
    category, order, product, product_image, seller_profile, user,
};
use crate::mutation::{Mutation, MutationSet};
use crate::repositories::{
    CategoryRepository, OrderFilter, OrderRepository, ProductFilter, ProductRepository,
    SellerProfileRepository, UserFilter, UserRepository,
};

fn db_err(e: DbErr) -> AppError {
    AppError::Database(e.to_string())
}

fn insert_err(what: &str, e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::AlreadyExists(what.to_string()),
        _ => db_err(e),
    }
}

/// Entity store over a sea-orm connection pool.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
    users: UserRepository,
    sellers: SellerProfileRepository,
    categories: CategoryRepository,
    products: ProductRepository,
    orders: OrderRepository,
}

impl SeaOrmStore {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            users: UserRepository::new(Arc::clone(&db)),
            sellers: SellerProfileRepository::new(Arc::clone(&db)),
            categories: CategoryRepository::new(Arc::clone(&db)),
            products: ProductRepository::new(Arc::clone(&db)),
            orders: OrderRepository::new(Arc::clone(&db)),
            db,
        }
    }
}

#[async_trait]
impl EntityStore for SeaOrmStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(Box::new(SeaOrmTransaction { txn }))
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<user::Model>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        self.users.find_by_email(email).await
    }

    async fn find_user_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        self.users.find_by_token(token).await
    }

    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        self.users.find_by_ids(ids).await
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<user::Model>> {
        self.users.list(filter).await
    }

    async fn count_users(&self, filter: &UserFilter) -> AppResult<u64> {
        self.users.count(filter).await
    }

    async fn find_seller_profile(&self, id: &str) -> AppResult<Option<seller_profile::Model>> {
        self.sellers.find_by_id(id).await
    }

    async fn find_seller_profile_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<seller_profile::Model>> {
        self.sellers.find_by_user_id(user_id).await
    }

    async fn find_seller_profiles(&self, ids: &[String]) -> AppResult<Vec<seller_profile::Model>> {
        self.sellers.find_by_ids(ids).await
    }

    async fn list_seller_profiles(
        &self,
        pending_only: bool,
    ) -> AppResult<Vec<seller_profile::Model>> {
        self.sellers.list(pending_only).await
    }

    async fn find_category(&self, id: &str) -> AppResult<Option<category::Model>> {
        self.categories.find_by_id(id).await
    }

    async fn list_categories(&self) -> AppResult<Vec<category::Model>> {
        self.categories.list().await
    }

    async fn count_products_by_category(
        &self,
        listed_only: bool,
    ) -> AppResult<BTreeMap<String, u64>> {
        self.categories.product_counts(listed_only).await
    }

    async fn find_product(&self, id: &str) -> AppResult<Option<product::Model>> {
        self.products.find_by_id(id).await
    }

    async fn find_products(&self, ids: &[String]) -> AppResult<Vec<product::Model>> {
        self.products.find_by_ids(ids).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<product::Model>> {
        self.products.list(filter).await
    }

    async fn product_images(&self, product_id: &str) -> AppResult<Vec<product_image::Model>> {
        self.products.find_images(product_id).await
    }

    async fn find_order(&self, id: &str) -> AppResult<Option<order::Model>> {
        self.orders.find_by_id(id).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<order::Model>> {
        self.orders.list(filter).await
    }
}

/// A sea-orm transaction. Reads use `SELECT ... FOR UPDATE`.
pub struct SeaOrmTransaction {
    txn: DatabaseTransaction,
}

impl SeaOrmTransaction {
    async fn execute(&self, mutation: &Mutation, set: &MutationSet) -> AppResult<u64> {
        let at = set.at;
        let txn = &self.txn;

        let rows = match mutation {
            Mutation::InsertUser(model) => User::insert(model.clone().into_active_model())
                .exec_without_returning(txn)
                .await
                .map_err(|e| insert_err("A user with this email already exists", e))?,
            Mutation::SetUserToken { user_id, token } => {
                User::update_many()
                    .set(user::ActiveModel {
                        token: Set(token.clone()),
                        ..Default::default()
                    })
                    .filter(user::Column::Id.eq(user_id.as_str()))
                    .filter(user::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SetUserRole { user_id, role } => {
                User::update_many()
                    .set(user::ActiveModel {
                        role: Set(*role),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(user::Column::Id.eq(user_id.as_str()))
                    .filter(user::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SoftDeleteUser { user_id } => {
                User::update_many()
                    .set(user::ActiveModel {
                        is_deleted: Set(true),
                        deleted_at: Set(Some(at)),
                        token: Set(None),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(user::Column::Id.eq(user_id.as_str()))
                    .filter(user::Column::IsDeleted.eq(false))
                    .filter(user::Column::IsSuperAdmin.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::InsertSellerProfile(model) => {
                SellerProfile::insert(model.clone().into_active_model())
                    .exec_without_returning(txn)
                    .await
                    .map_err(|e| insert_err("You already have a seller profile", e))?
            }
            Mutation::UpdateSellerDetails { seller_id, changes } => {
                let mut active = seller_profile::ActiveModel {
                    updated_at: Set(Some(at)),
                    ..Default::default()
                };
                if let Some(v) = &changes.business_name {
                    active.business_name = Set(v.clone());
                }
                if let Some(v) = &changes.business_description {
                    active.business_description = Set(v.clone());
                }
                if let Some(v) = &changes.payment_methods {
                    active.payment_methods = Set(serde_json::json!(v));
                }
                if let Some(v) = changes.average_shipping_cost_cents {
                    active.average_shipping_cost_cents = Set(v);
                }
                if let Some(v) = changes.estimated_delivery_days {
                    active.estimated_delivery_days = Set(v);
                }
                if let Some(v) = &changes.shipping_regions {
                    active.shipping_regions = Set(v.clone());
                }
                if let Some(v) = &changes.social_links {
                    active.social_links = Set(Some(v.clone()));
                }

                SellerProfile::update_many()
                    .set(active)
                    .filter(seller_profile::Column::Id.eq(seller_id.as_str()))
                    .filter(seller_profile::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::ApproveSellerProfile {
                seller_id,
                seller_type,
            } => {
                SellerProfile::update_many()
                    .set(seller_profile::ActiveModel {
                        is_approved: Set(true),
                        seller_type: Set(Some(*seller_type)),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(seller_profile::Column::Id.eq(seller_id.as_str()))
                    .filter(seller_profile::Column::IsApproved.eq(false))
                    .filter(seller_profile::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SetSellerType {
                seller_id,
                seller_type,
            } => {
                SellerProfile::update_many()
                    .set(seller_profile::ActiveModel {
                        seller_type: Set(Some(*seller_type)),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(seller_profile::Column::Id.eq(seller_id.as_str()))
                    .filter(seller_profile::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SoftDeleteSellerProfile { seller_id } => {
                SellerProfile::update_many()
                    .set(seller_profile::ActiveModel {
                        is_deleted: Set(true),
                        deleted_at: Set(Some(at)),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(seller_profile::Column::Id.eq(seller_id.as_str()))
                    .filter(seller_profile::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::InsertCategory(model) => Category::insert(model.clone().into_active_model())
                .exec_without_returning(txn)
                .await
                .map_err(|e| insert_err("A category with this name already exists", e))?,
            Mutation::UpdateCategory {
                category_id,
                changes,
            } => {
                let mut active = category::ActiveModel::default();
                if let Some(v) = &changes.name {
                    active.name = Set(v.clone());
                }
                if let Some(v) = &changes.description {
                    active.description = Set(Some(v.clone()));
                }
                Category::update_many()
                    .set(active)
                    .filter(category::Column::Id.eq(category_id.as_str()))
                    .exec(txn)
                    .await
                    .map_err(|e| insert_err("A category with this name already exists", e))?
                    .rows_affected
            }
            Mutation::InsertProduct { product, images } => {
                let mut rows = Product::insert(product.clone().into_active_model())
                    .exec_without_returning(txn)
                    .await
                    .map_err(|e| insert_err("Product already exists", e))?;
                if !images.is_empty() {
                    rows += ProductImage::insert_many(
                        images.iter().cloned().map(IntoActiveModel::into_active_model),
                    )
                    .exec_without_returning(txn)
                    .await
                    .map_err(db_err)?;
                }
                rows
            }
            Mutation::UpdateProductContent {
                product_id,
                changes,
            } => {
                let mut active = product::ActiveModel {
                    is_approved: Set(false),
                    updated_at: Set(Some(at)),
                    ..Default::default()
                };
                if let Some(v) = &changes.name {
                    active.name = Set(v.clone());
                }
                if let Some(v) = &changes.description {
                    active.description = Set(v.clone());
                }
                if let Some(v) = changes.price_cents {
                    active.price_cents = Set(v);
                }
                if let Some(v) = &changes.category_id {
                    active.category_id = Set(v.clone());
                }

                Product::update_many()
                    .set(active)
                    .filter(product::Column::Id.eq(product_id.as_str()))
                    .filter(product::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::ApproveProduct { product_id } => {
                Product::update_many()
                    .set(product::ActiveModel {
                        is_approved: Set(true),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(product::Column::Id.eq(product_id.as_str()))
                    .filter(product::Column::IsApproved.eq(false))
                    .filter(product::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SoftDeleteProduct { product_id } => {
                Product::update_many()
                    .set(product::ActiveModel {
                        is_deleted: Set(true),
                        deleted_at: Set(Some(at)),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(product::Column::Id.eq(product_id.as_str()))
                    .filter(product::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SoftDeleteProductsOfSeller { seller_id } => {
                Product::update_many()
                    .set(product::ActiveModel {
                        is_deleted: Set(true),
                        deleted_at: Set(Some(at)),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(product::Column::SellerId.eq(seller_id.as_str()))
                    .filter(product::Column::IsDeleted.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::SetProductTypeForSeller {
                seller_id,
                product_type,
            } => {
                Product::update_many()
                    .set(product::ActiveModel {
                        product_type: Set(Some(*product_type)),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(product::Column::SellerId.eq(seller_id.as_str()))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::InsertOrder(model) => Order::insert(model.clone().into_active_model())
                .exec_without_returning(txn)
                .await
                .map_err(|e| insert_err("Order already exists", e))?,
            Mutation::AdvanceOrder { order_id, from, to } => {
                Order::update_many()
                    .set(order::ActiveModel {
                        status: Set(*to),
                        updated_at: Set(Some(at)),
                        ..Default::default()
                    })
                    .filter(order::Column::Id.eq(order_id.as_str()))
                    .filter(order::Column::Status.eq(*from))
                    .filter(order::Column::IsCancelled.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::CancelPendingOrder { order_id, reason } => {
                Order::update_many()
                    .set(cancelled(*reason, at))
                    .filter(order::Column::Id.eq(order_id.as_str()))
                    .filter(order::Column::Status.eq(OrderStatus::Pending))
                    .filter(order::Column::IsCancelled.eq(false))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::CancelOpenOrdersAsSeller { seller_id, reason } => {
                Order::update_many()
                    .set(cancelled(*reason, at))
                    .filter(order::Column::SellerId.eq(seller_id.as_str()))
                    .filter(order::Column::Status.is_in(OrderStatus::OPEN))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
            Mutation::CancelOpenOrdersAsBuyer { buyer_id, reason } => {
                Order::update_many()
                    .set(cancelled(*reason, at))
                    .filter(order::Column::BuyerId.eq(buyer_id.as_str()))
                    .filter(order::Column::Status.is_in(OrderStatus::OPEN))
                    .exec(txn)
                    .await
                    .map_err(db_err)?
                    .rows_affected
            }
        };

        Ok(rows)
    }
}

fn cancelled(reason: CancellationReason, at: DateTimeWithTimeZone) -> order::ActiveModel {
    order::ActiveModel {
        status: Set(OrderStatus::Cancelled),
        is_cancelled: Set(true),
        cancellation_reason: Set(Some(reason)),
        updated_at: Set(Some(at)),
        ..Default::default()
    }
}

#[async_trait]
impl StoreTransaction for SeaOrmTransaction {
    async fn user(&mut self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn seller_profile(&mut self, id: &str) -> AppResult<Option<seller_profile::Model>> {
        SellerProfile::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn seller_profile_by_user(
        &mut self,
        user_id: &str,
    ) -> AppResult<Option<seller_profile::Model>> {
        SellerProfile::find()
            .filter(seller_profile::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn category(&mut self, id: &str) -> AppResult<Option<category::Model>> {
        Category::find_by_id(id)
            .lock_shared()
            .one(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn product(&mut self, id: &str) -> AppResult<Option<product::Model>> {
        Product::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn order(&mut self, id: &str) -> AppResult<Option<order::Model>> {
        Order::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn image_keys_for_product(&mut self, product_id: &str) -> AppResult<Vec<String>> {
        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(images.into_iter().map(|i| i.public_id).collect())
    }

    async fn image_keys_for_seller(&mut self, seller_id: &str) -> AppResult<Vec<String>> {
        let images = ProductImage::find()
            .inner_join(Product)
            .filter(product::Column::SellerId.eq(seller_id))
            .filter(product::Column::IsDeleted.eq(false))
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(images.into_iter().map(|i| i.public_id).collect())
    }

    async fn apply(&mut self, set: &MutationSet) -> AppResult<u64> {
        let mut total = 0;
        for mutation in &set.mutations {
            let rows = self.execute(mutation, set).await?;
            if mutation.is_guarded() && rows == 0 {
                debug!(set = set.label, mutation = mutation.name(), "Guarded write matched no rows");
                return Err(mutation.guard_failure());
            }
            total += rows;
        }
        Ok(total)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await.map_err(db_err)
    }
}
