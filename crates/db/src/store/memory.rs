//! In-process entity store.
//!
//! Holds every table in memory behind one async mutex. A transaction owns
//! the mutex for its whole lifetime and works on a private copy, which is
//! swapped in on commit, so concurrent transactions are fully serialized and
//! an aborted one leaves nothing behind. Non-transactional reads wait for any
//! open transaction to finish; never call them while holding one.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as SyncMutex};

use async_trait::async_trait;
use fanforge_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use super::{EntityStore, StoreTransaction};
use crate::entities::{
    CancellationReason, OrderStatus, category, order, product, product_image, seller_profile,
    user,
};
use crate::mutation::{Mutation, MutationSet};
use crate::repositories::{OrderFilter, ProductFilter, ProductVisibility, UserFilter};

/// Failures the store can be told to simulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryFailure {
    /// Fail when a mutation with this [`Mutation::name`] is applied.
    OnMutation(&'static str),
    /// Fail every commit.
    OnCommit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<String, user::Model>,
    seller_profiles: BTreeMap<String, seller_profile::Model>,
    categories: BTreeMap<String, category::Model>,
    products: BTreeMap<String, product::Model>,
    product_images: BTreeMap<String, product_image::Model>,
    orders: BTreeMap<String, order::Model>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    tables: Arc<Mutex<Tables>>,
    fail_mode: RwLock<Option<MemoryFailure>>,
    lock_log: SyncMutex<Vec<Vec<(LockedTable, String)>>>,
}

/// Tables a transaction takes row locks on, in the order they must be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockedTable {
    User,
    SellerProfile,
    Product,
    Order,
}

/// In-memory store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a failure on subsequent transactions.
    pub async fn set_failure(&self, failure: MemoryFailure) {
        *self.inner.fail_mode.write().await = Some(failure);
    }

    /// Stop simulating failures.
    pub async fn clear_failure(&self) {
        *self.inner.fail_mode.write().await = None;
    }

    /// Tables of the rows each transaction begun so far locked, in the order
    /// it first locked them. One entry per transaction.
    #[must_use]
    pub fn lock_trace(&self) -> Vec<Vec<LockedTable>> {
        self.inner
            .lock_log
            .lock()
            .map(|log| {
                log.iter()
                    .map(|rows| rows.iter().map(|(table, _)| *table).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Forget recorded lock traces.
    pub fn clear_lock_trace(&self) {
        if let Ok(mut log) = self.inner.lock_log.lock() {
            log.clear();
        }
    }

    /// Apply mutations in their own committed transaction.
    pub async fn seed(&self, mutations: Vec<Mutation>) -> AppResult<()> {
        let mut set = MutationSet::new("seed", chrono::Utc::now().into());
        for mutation in mutations {
            set.push(mutation);
        }

        let mut tx = self.begin().await?;
        tx.apply(&set).await?;
        tx.commit().await
    }
}

fn page<T>(rows: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

impl Tables {
    fn user_by_email(&self, email: &str) -> Option<&user::Model> {
        let email = email.to_lowercase();
        self.users.values().find(|u| u.email == email)
    }

    fn profile_by_user(&self, user_id: &str) -> Option<&seller_profile::Model> {
        self.seller_profiles.values().find(|p| p.user_id == user_id)
    }

    fn filtered_users(&self, filter: &UserFilter) -> Vec<user::Model> {
        let mut rows: Vec<_> = self
            .users
            .values()
            .filter(|u| !u.is_deleted)
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .cloned()
            .collect();
        rows.sort_by_key(|u| Reverse((u.created_at, u.id.clone())));
        rows
    }

    fn product_visible(&self, p: &product::Model, visibility: ProductVisibility) -> bool {
        if p.is_deleted {
            return false;
        }
        match visibility {
            ProductVisibility::Public => {
                p.is_approved
                    && self
                        .seller_profiles
                        .get(&p.seller_id)
                        .is_some_and(|s| s.is_approved && !s.is_deleted)
            }
            ProductVisibility::PendingReview => !p.is_approved,
            ProductVisibility::NotDeleted => true,
        }
    }

    fn image_keys(&self, product_ids: &[&str]) -> Vec<String> {
        let mut images: Vec<_> = self
            .product_images
            .values()
            .filter(|i| product_ids.contains(&i.product_id.as_str()))
            .collect();
        images.sort_by_key(|i| (i.product_id.clone(), i.position));
        images.into_iter().map(|i| i.public_id.clone()).collect()
    }

    fn cancel_where(
        &mut self,
        at: DateTimeWithTimeZone,
        reason: CancellationReason,
        pred: impl Fn(&order::Model) -> bool,
    ) -> u64 {
        let mut rows = 0;
        for o in self.orders.values_mut() {
            if OrderStatus::OPEN.contains(&o.status) && pred(o) {
                o.status = OrderStatus::Cancelled;
                o.is_cancelled = true;
                o.cancellation_reason = Some(reason);
                o.updated_at = Some(at);
                rows += 1;
            }
        }
        rows
    }

    fn execute(&mut self, mutation: &Mutation, at: DateTimeWithTimeZone) -> AppResult<u64> {
        let rows = match mutation {
            Mutation::InsertUser(model) => {
                let token_taken = model.token.as_ref().is_some_and(|t| {
                    self.users
                        .values()
                        .any(|u| u.token.as_deref() == Some(t.as_str()))
                });
                if self.users.contains_key(&model.id)
                    || self.user_by_email(&model.email).is_some()
                    || token_taken
                {
                    return Err(AppError::AlreadyExists(
                        "A user with this email already exists".to_string(),
                    ));
                }
                self.users.insert(model.id.clone(), model.clone());
                1
            }
            Mutation::SetUserToken { user_id, token } => {
                match self.users.get_mut(user_id).filter(|u| !u.is_deleted) {
                    Some(u) => {
                        u.token.clone_from(token);
                        1
                    }
                    None => 0,
                }
            }
            Mutation::SetUserRole { user_id, role } => {
                match self.users.get_mut(user_id).filter(|u| !u.is_deleted) {
                    Some(u) => {
                        u.role = *role;
                        u.updated_at = Some(at);
                        1
                    }
                    None => 0,
                }
            }
            Mutation::SoftDeleteUser { user_id } => {
                match self
                    .users
                    .get_mut(user_id)
                    .filter(|u| !u.is_deleted && !u.is_super_admin)
                {
                    Some(u) => {
                        u.is_deleted = true;
                        u.deleted_at = Some(at);
                        u.token = None;
                        u.updated_at = Some(at);
                        1
                    }
                    None => 0,
                }
            }
            Mutation::InsertSellerProfile(model) => {
                if self.seller_profiles.contains_key(&model.id)
                    || self.profile_by_user(&model.user_id).is_some()
                {
                    return Err(AppError::AlreadyExists(
                        "You already have a seller profile".to_string(),
                    ));
                }
                self.seller_profiles.insert(model.id.clone(), model.clone());
                1
            }
            Mutation::UpdateSellerDetails { seller_id, changes } => {
                match self
                    .seller_profiles
                    .get_mut(seller_id)
                    .filter(|p| !p.is_deleted)
                {
                    Some(p) => {
                        if let Some(v) = &changes.business_name {
                            p.business_name.clone_from(v);
                        }
                        if let Some(v) = &changes.business_description {
                            p.business_description.clone_from(v);
                        }
                        if let Some(v) = &changes.payment_methods {
                            p.payment_methods = serde_json::json!(v);
                        }
                        if let Some(v) = changes.average_shipping_cost_cents {
                            p.average_shipping_cost_cents = v;
                        }
                        if let Some(v) = changes.estimated_delivery_days {
                            p.estimated_delivery_days = v;
                        }
                        if let Some(v) = &changes.shipping_regions {
                            p.shipping_regions.clone_from(v);
                        }
                        if let Some(v) = &changes.social_links {
                            p.social_links = Some(v.clone());
                        }
                        p.updated_at = Some(at);
                        1
                    }
                    None => 0,
                }
            }
            Mutation::ApproveSellerProfile {
                seller_id,
                seller_type,
            } => match self
                .seller_profiles
                .get_mut(seller_id)
                .filter(|p| !p.is_approved && !p.is_deleted)
            {
                Some(p) => {
                    p.is_approved = true;
                    p.seller_type = Some(*seller_type);
                    p.updated_at = Some(at);
                    1
                }
                None => 0,
            },
            Mutation::SetSellerType {
                seller_id,
                seller_type,
            } => match self
                .seller_profiles
                .get_mut(seller_id)
                .filter(|p| !p.is_deleted)
            {
                Some(p) => {
                    p.seller_type = Some(*seller_type);
                    p.updated_at = Some(at);
                    1
                }
                None => 0,
            },
            Mutation::SoftDeleteSellerProfile { seller_id } => match self
                .seller_profiles
                .get_mut(seller_id)
                .filter(|p| !p.is_deleted)
            {
                Some(p) => {
                    p.is_deleted = true;
                    p.deleted_at = Some(at);
                    p.updated_at = Some(at);
                    1
                }
                None => 0,
            },
            Mutation::InsertCategory(model) => {
                if self.categories.contains_key(&model.id)
                    || self.categories.values().any(|c| c.name == model.name)
                {
                    return Err(AppError::AlreadyExists(
                        "A category with this name already exists".to_string(),
                    ));
                }
                self.categories.insert(model.id.clone(), model.clone());
                1
            }
            Mutation::UpdateCategory {
                category_id,
                changes,
            } => {
                if let Some(name) = &changes.name {
                    if self
                        .categories
                        .values()
                        .any(|c| &c.name == name && &c.id != category_id)
                    {
                        return Err(AppError::AlreadyExists(
                            "A category with this name already exists".to_string(),
                        ));
                    }
                }
                match self.categories.get_mut(category_id) {
                    Some(c) => {
                        if let Some(v) = &changes.name {
                            c.name.clone_from(v);
                        }
                        if let Some(v) = &changes.description {
                            c.description = Some(v.clone());
                        }
                        1
                    }
                    None => 0,
                }
            }
            Mutation::InsertProduct { product, images } => {
                if self.products.contains_key(&product.id) {
                    return Err(AppError::AlreadyExists("Product already exists".to_string()));
                }
                self.products.insert(product.id.clone(), product.clone());
                for image in images {
                    self.product_images.insert(image.id.clone(), image.clone());
                }
                1 + images.len() as u64
            }
            Mutation::UpdateProductContent {
                product_id,
                changes,
            } => match self.products.get_mut(product_id).filter(|p| !p.is_deleted) {
                Some(p) => {
                    if let Some(v) = &changes.name {
                        p.name.clone_from(v);
                    }
                    if let Some(v) = &changes.description {
                        p.description.clone_from(v);
                    }
                    if let Some(v) = changes.price_cents {
                        p.price_cents = v;
                    }
                    if let Some(v) = &changes.category_id {
                        p.category_id.clone_from(v);
                    }
                    p.is_approved = false;
                    p.updated_at = Some(at);
                    1
                }
                None => 0,
            },
            Mutation::ApproveProduct { product_id } => match self
                .products
                .get_mut(product_id)
                .filter(|p| !p.is_approved && !p.is_deleted)
            {
                Some(p) => {
                    p.is_approved = true;
                    p.updated_at = Some(at);
                    1
                }
                None => 0,
            },
            Mutation::SoftDeleteProduct { product_id } => {
                match self.products.get_mut(product_id).filter(|p| !p.is_deleted) {
                    Some(p) => {
                        p.is_deleted = true;
                        p.deleted_at = Some(at);
                        p.updated_at = Some(at);
                        1
                    }
                    None => 0,
                }
            }
            Mutation::SoftDeleteProductsOfSeller { seller_id } => {
                let mut rows = 0;
                for p in self
                    .products
                    .values_mut()
                    .filter(|p| p.seller_id == *seller_id && !p.is_deleted)
                {
                    p.is_deleted = true;
                    p.deleted_at = Some(at);
                    p.updated_at = Some(at);
                    rows += 1;
                }
                rows
            }
            Mutation::SetProductTypeForSeller {
                seller_id,
                product_type,
            } => {
                let mut rows = 0;
                for p in self
                    .products
                    .values_mut()
                    .filter(|p| p.seller_id == *seller_id)
                {
                    p.product_type = Some(*product_type);
                    p.updated_at = Some(at);
                    rows += 1;
                }
                rows
            }
            Mutation::InsertOrder(model) => {
                if self.orders.contains_key(&model.id) {
                    return Err(AppError::AlreadyExists("Order already exists".to_string()));
                }
                self.orders.insert(model.id.clone(), model.clone());
                1
            }
            Mutation::AdvanceOrder { order_id, from, to } => match self
                .orders
                .get_mut(order_id)
                .filter(|o| o.status == *from && !o.is_cancelled)
            {
                Some(o) => {
                    o.status = *to;
                    o.updated_at = Some(at);
                    1
                }
                None => 0,
            },
            Mutation::CancelPendingOrder { order_id, reason } => {
                let id = order_id.as_str();
                self.cancel_where(at, *reason, |o| {
                    o.id == id && o.status == OrderStatus::Pending && !o.is_cancelled
                })
            }
            Mutation::CancelOpenOrdersAsSeller { seller_id, reason } => {
                let id = seller_id.as_str();
                self.cancel_where(at, *reason, |o| o.seller_id == id)
            }
            Mutation::CancelOpenOrdersAsBuyer { buyer_id, reason } => {
                let id = buyer_id.as_str();
                self.cancel_where(at, *reason, |o| o.buyer_id == id)
            }
        };

        Ok(rows)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.inner.tables).lock_owned().await;
        let working = guard.clone();
        let slot = match self.inner.lock_log.lock() {
            Ok(mut log) => {
                log.push(Vec::new());
                log.len() - 1
            }
            Err(_) => usize::MAX,
        };
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            store: self.clone(),
            slot,
        }))
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<user::Model>> {
        Ok(self.inner.tables.lock().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        Ok(self.inner.tables.lock().await.user_by_email(email).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        let tables = self.inner.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        let tables = self.inner.tables.lock().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<user::Model>> {
        let rows = self.inner.tables.lock().await.filtered_users(filter);
        Ok(page(rows, filter.offset, filter.limit))
    }

    async fn count_users(&self, filter: &UserFilter) -> AppResult<u64> {
        let rows = self.inner.tables.lock().await.filtered_users(filter);
        Ok(rows.len() as u64)
    }

    async fn find_seller_profile(&self, id: &str) -> AppResult<Option<seller_profile::Model>> {
        Ok(self.inner.tables.lock().await.seller_profiles.get(id).cloned())
    }

    async fn find_seller_profile_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<seller_profile::Model>> {
        Ok(self.inner.tables.lock().await.profile_by_user(user_id).cloned())
    }

    async fn find_seller_profiles(&self, ids: &[String]) -> AppResult<Vec<seller_profile::Model>> {
        let tables = self.inner.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.seller_profiles.get(id).cloned())
            .collect())
    }

    async fn list_seller_profiles(
        &self,
        pending_only: bool,
    ) -> AppResult<Vec<seller_profile::Model>> {
        let tables = self.inner.tables.lock().await;
        let mut rows: Vec<_> = tables
            .seller_profiles
            .values()
            .filter(|p| !p.is_deleted && (!pending_only || !p.is_approved))
            .cloned()
            .collect();
        rows.sort_by_key(|p| Reverse((p.created_at, p.id.clone())));
        Ok(rows)
    }

    async fn find_category(&self, id: &str) -> AppResult<Option<category::Model>> {
        Ok(self.inner.tables.lock().await.categories.get(id).cloned())
    }

    async fn list_categories(&self) -> AppResult<Vec<category::Model>> {
        let tables = self.inner.tables.lock().await;
        let mut rows: Vec<_> = tables.categories.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn count_products_by_category(
        &self,
        listed_only: bool,
    ) -> AppResult<BTreeMap<String, u64>> {
        let tables = self.inner.tables.lock().await;
        let mut counts = BTreeMap::new();
        for p in tables
            .products
            .values()
            .filter(|p| !listed_only || (p.is_approved && !p.is_deleted))
        {
            *counts.entry(p.category_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn find_product(&self, id: &str) -> AppResult<Option<product::Model>> {
        Ok(self.inner.tables.lock().await.products.get(id).cloned())
    }

    async fn find_products(&self, ids: &[String]) -> AppResult<Vec<product::Model>> {
        let tables = self.inner.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<product::Model>> {
        let tables = self.inner.tables.lock().await;
        let mut rows: Vec<_> = tables
            .products
            .values()
            .filter(|p| tables.product_visible(p, filter.visibility))
            .filter(|p| filter.seller_id.as_ref().is_none_or(|s| p.seller_id == *s))
            .filter(|p| filter.category_id.as_ref().is_none_or(|c| p.category_id == *c))
            .filter(|p| filter.product_type.is_none_or(|t| p.product_type == Some(t)))
            .filter(|p| filter.search.as_ref().is_none_or(|q| p.name.contains(q.as_str())))
            .cloned()
            .collect();
        rows.sort_by_key(|p| Reverse((p.created_at, p.id.clone())));
        Ok(page(rows, filter.offset, filter.limit))
    }

    async fn product_images(&self, product_id: &str) -> AppResult<Vec<product_image::Model>> {
        let tables = self.inner.tables.lock().await;
        let mut rows: Vec<_> = tables
            .product_images
            .values()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.position);
        Ok(rows)
    }

    async fn find_order(&self, id: &str) -> AppResult<Option<order::Model>> {
        Ok(self.inner.tables.lock().await.orders.get(id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<order::Model>> {
        let tables = self.inner.tables.lock().await;
        let mut rows: Vec<_> = tables
            .orders
            .values()
            .filter(|o| filter.buyer_id.as_ref().is_none_or(|b| o.buyer_id == *b))
            .filter(|o| filter.seller_id.as_ref().is_none_or(|s| o.seller_id == *s))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        rows.sort_by_key(|o| Reverse((o.created_at, o.id.clone())));
        Ok(page(rows, filter.offset, filter.limit))
    }
}

/// Transaction over a private copy of the tables.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    store: MemoryStore,
    slot: usize,
}

impl MemoryTransaction {
    async fn failure(&self) -> Option<MemoryFailure> {
        self.store.inner.fail_mode.read().await.clone()
    }

    /// Note a row lock. Rows already held are not locked again.
    fn record(&self, table: LockedTable, id: Option<&str>) {
        let Some(id) = id else { return };
        if let Ok(mut log) = self.store.inner.lock_log.lock() {
            if let Some(rows) = log.get_mut(self.slot) {
                if !rows.iter().any(|(t, held)| *t == table && held == id) {
                    rows.push((table, id.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn user(&mut self, id: &str) -> AppResult<Option<user::Model>> {
        let row = self.working.users.get(id).cloned();
        self.record(LockedTable::User, row.as_ref().map(|r| r.id.as_str()));
        Ok(row)
    }

    async fn seller_profile(&mut self, id: &str) -> AppResult<Option<seller_profile::Model>> {
        let row = self.working.seller_profiles.get(id).cloned();
        self.record(LockedTable::SellerProfile, row.as_ref().map(|r| r.id.as_str()));
        Ok(row)
    }

    async fn seller_profile_by_user(
        &mut self,
        user_id: &str,
    ) -> AppResult<Option<seller_profile::Model>> {
        let row = self.working.profile_by_user(user_id).cloned();
        self.record(LockedTable::SellerProfile, row.as_ref().map(|r| r.id.as_str()));
        Ok(row)
    }

    async fn category(&mut self, id: &str) -> AppResult<Option<category::Model>> {
        Ok(self.working.categories.get(id).cloned())
    }

    async fn product(&mut self, id: &str) -> AppResult<Option<product::Model>> {
        let row = self.working.products.get(id).cloned();
        self.record(LockedTable::Product, row.as_ref().map(|r| r.id.as_str()));
        Ok(row)
    }

    async fn order(&mut self, id: &str) -> AppResult<Option<order::Model>> {
        let row = self.working.orders.get(id).cloned();
        self.record(LockedTable::Order, row.as_ref().map(|r| r.id.as_str()));
        Ok(row)
    }

    async fn image_keys_for_product(&mut self, product_id: &str) -> AppResult<Vec<String>> {
        Ok(self.working.image_keys(&[product_id]))
    }

    async fn image_keys_for_seller(&mut self, seller_id: &str) -> AppResult<Vec<String>> {
        let ids: Vec<String> = self
            .working
            .products
            .values()
            .filter(|p| p.seller_id == seller_id && !p.is_deleted)
            .map(|p| p.id.clone())
            .collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        Ok(self.working.image_keys(&ids))
    }

    async fn apply(&mut self, set: &MutationSet) -> AppResult<u64> {
        let failure = self.failure().await;
        let mut total = 0;
        for mutation in &set.mutations {
            if failure == Some(MemoryFailure::OnMutation(mutation.name())) {
                return Err(AppError::Database(format!(
                    "simulated failure on {}",
                    mutation.name()
                )));
            }
            let rows = self.working.execute(mutation, set.at)?;
            if mutation.is_guarded() && rows == 0 {
                debug!(set = set.label, mutation = mutation.name(), "Guarded write matched no rows");
                return Err(mutation.guard_failure());
            }
            total += rows;
        }
        Ok(total)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        if self.failure().await == Some(MemoryFailure::OnCommit) {
            return Err(AppError::Database("simulated commit failure".to_string()));
        }
        let Self {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use chrono::Utc;

    fn test_user(id: &str, email: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
            full_name: "Test User".to_string(),
            phone_number: "0123456789".to_string(),
            address: "1 Test Street".to_string(),
            role: UserRole::Buyer,
            is_super_admin: false,
            token: None,
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_order(id: &str, buyer_id: &str, status: OrderStatus) -> order::Model {
        order::Model {
            id: id.to_string(),
            buyer_id: buyer_id.to_string(),
            seller_id: "sp1".to_string(),
            product_id: "p1".to_string(),
            buyer_address: "1 Test Street".to_string(),
            buyer_phone: "0123456789".to_string(),
            buyer_notes: None,
            status,
            is_cancelled: false,
            cancellation_reason: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        store
            .seed(vec![Mutation::InsertUser(test_user("u1", "a@example.com"))])
            .await
            .unwrap();

        assert!(store.find_user("u1").await.unwrap().is_some());
        assert!(
            store
                .find_user_by_email("A@example.com")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            let set = MutationSet::new("test", Utc::now().into())
                .with(Mutation::InsertUser(test_user("u1", "a@example.com")));
            tx.apply(&set).await.unwrap();
        }

        assert!(store.find_user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_email() {
        let store = MemoryStore::new();
        store
            .seed(vec![Mutation::InsertUser(test_user("u1", "a@example.com"))])
            .await
            .unwrap();

        let err = store
            .seed(vec![Mutation::InsertUser(test_user("u2", "a@example.com"))])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_injected_mutation_failure_discards_whole_set() {
        let store = MemoryStore::new();
        store
            .seed(vec![
                Mutation::InsertUser(test_user("u1", "a@example.com")),
                Mutation::InsertOrder(test_order("o1", "u1", OrderStatus::Accepted)),
            ])
            .await
            .unwrap();
        store
            .set_failure(MemoryFailure::OnMutation("cancel_open_orders_as_buyer"))
            .await;

        let set = MutationSet::new("ban_user", Utc::now().into())
            .with(Mutation::SoftDeleteUser {
                user_id: "u1".to_string(),
            })
            .with(Mutation::CancelOpenOrdersAsBuyer {
                buyer_id: "u1".to_string(),
                reason: CancellationReason::UserBanned,
            });
        let mut tx = store.begin().await.unwrap();
        assert!(tx.apply(&set).await.is_err());
        drop(tx);

        assert!(!store.find_user("u1").await.unwrap().unwrap().is_deleted);
        assert_eq!(
            store.find_order("o1").await.unwrap().unwrap().status,
            OrderStatus::Accepted
        );
    }

    #[tokio::test]
    async fn test_commit_failure_discards_writes() {
        let store = MemoryStore::new();
        store.set_failure(MemoryFailure::OnCommit).await;

        let err = store
            .seed(vec![Mutation::InsertUser(test_user("u1", "a@example.com"))])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        store.clear_failure().await;
        assert!(store.find_user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cascade_cancel_skips_terminal_orders() {
        let store = MemoryStore::new();
        store
            .seed(vec![
                Mutation::InsertOrder(test_order("o1", "u1", OrderStatus::Shipped)),
                Mutation::InsertOrder(test_order("o2", "u1", OrderStatus::Delivered)),
            ])
            .await
            .unwrap();

        let set = MutationSet::new("ban_user", Utc::now().into()).with(
            Mutation::CancelOpenOrdersAsBuyer {
                buyer_id: "u1".to_string(),
                reason: CancellationReason::UserBanned,
            },
        );
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.apply(&set).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let o1 = store.find_order("o1").await.unwrap().unwrap();
        assert_eq!(o1.status, OrderStatus::Cancelled);
        assert!(o1.is_cancelled);
        assert_eq!(o1.cancellation_reason, Some(CancellationReason::UserBanned));
        let o2 = store.find_order("o2").await.unwrap().unwrap();
        assert_eq!(o2.status, OrderStatus::Delivered);
    }
}
