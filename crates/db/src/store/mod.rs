//! Transactional entity store.
//!
//! [`EntityStore`] is the seam between the marketplace core and persistence.
//! [`SeaOrmStore`] backs it with `PostgreSQL`; [`MemoryStore`] keeps
//! everything in process and can inject failures for atomicity tests.

mod memory;
mod sea;

pub use memory::{LockedTable, MemoryFailure, MemoryStore};
pub use sea::SeaOrmStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fanforge_common::AppResult;

use crate::entities::{category, order, product, product_image, seller_profile, user};
use crate::mutation::MutationSet;
use crate::repositories::{OrderFilter, ProductFilter, UserFilter};

/// Shared handle to the store.
pub type Store = Arc<dyn EntityStore>;

/// Read access outside a transaction plus the ability to open one.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Open a transaction. Dropping it without [`StoreTransaction::commit`]
    /// rolls it back.
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;

    async fn find_user(&self, id: &str) -> AppResult<Option<user::Model>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<user::Model>>;
    async fn find_user_by_token(&self, token: &str) -> AppResult<Option<user::Model>>;
    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<user::Model>>;
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<user::Model>>;
    async fn count_users(&self, filter: &UserFilter) -> AppResult<u64>;

    async fn find_seller_profile(&self, id: &str) -> AppResult<Option<seller_profile::Model>>;
    async fn find_seller_profile_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<seller_profile::Model>>;
    async fn find_seller_profiles(&self, ids: &[String]) -> AppResult<Vec<seller_profile::Model>>;
    async fn list_seller_profiles(&self, pending_only: bool)
    -> AppResult<Vec<seller_profile::Model>>;

    async fn find_category(&self, id: &str) -> AppResult<Option<category::Model>>;
    async fn list_categories(&self) -> AppResult<Vec<category::Model>>;
    /// Products per category id. With `listed_only`, only approved products
    /// that are not deleted count. Categories without products are absent.
    async fn count_products_by_category(&self, listed_only: bool)
    -> AppResult<BTreeMap<String, u64>>;

    async fn find_product(&self, id: &str) -> AppResult<Option<product::Model>>;
    async fn find_products(&self, ids: &[String]) -> AppResult<Vec<product::Model>>;
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<product::Model>>;
    async fn product_images(&self, product_id: &str) -> AppResult<Vec<product_image::Model>>;

    async fn find_order(&self, id: &str) -> AppResult<Option<order::Model>>;
    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<order::Model>>;
}

/// An open transaction. Reads lock the rows they return until commit or
/// rollback, so checks made on them hold when the mutation set is applied.
///
/// Callers take locks in [`LockedTable`] order (users, seller profiles,
/// products, orders) and lock users in id order.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn user(&mut self, id: &str) -> AppResult<Option<user::Model>>;
    async fn seller_profile(&mut self, id: &str) -> AppResult<Option<seller_profile::Model>>;
    async fn seller_profile_by_user(
        &mut self,
        user_id: &str,
    ) -> AppResult<Option<seller_profile::Model>>;
    async fn category(&mut self, id: &str) -> AppResult<Option<category::Model>>;
    async fn product(&mut self, id: &str) -> AppResult<Option<product::Model>>;
    async fn order(&mut self, id: &str) -> AppResult<Option<order::Model>>;

    /// Image store keys of one product.
    async fn image_keys_for_product(&mut self, product_id: &str) -> AppResult<Vec<String>>;

    /// Image store keys of every non-deleted product of a seller.
    async fn image_keys_for_seller(&mut self, seller_id: &str) -> AppResult<Vec<String>>;

    /// Apply every mutation in order. Returns the total number of rows
    /// written. Any error leaves the transaction unusable; drop it.
    async fn apply(&mut self, set: &MutationSet) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
