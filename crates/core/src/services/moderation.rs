//! Admin review of sellers and products.

use fanforge_common::{AppError, AppResult};
use fanforge_db::entities::{SellerType, product, seller_profile};
use fanforge_db::repositories::{ProductFilter, ProductVisibility};
use fanforge_db::Store;
use serde_json::json;
use tracing::info;

use crate::actor::Actor;
use crate::cascade::{CascadeEngine, SellerApproval, SellerRetype, now, plan_approve_product};
use crate::services::notification::{Notification, NotificationDispatcher, NotificationKind};

/// Approval queues and removals for admins.
#[derive(Clone)]
pub struct ModerationService {
    store: Store,
    cascade: CascadeEngine,
    notifications: NotificationDispatcher,
}

impl ModerationService {
    #[must_use]
    pub const fn new(
        store: Store,
        cascade: CascadeEngine,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            cascade,
            notifications,
        }
    }

    /// Applications waiting for review, oldest first.
    pub async fn pending_sellers(&self, actor: &Actor) -> AppResult<Vec<seller_profile::Model>> {
        actor.require_admin()?;
        self.store.list_seller_profiles(true).await
    }

    /// Every seller that has not been removed.
    pub async fn all_sellers(&self, actor: &Actor) -> AppResult<Vec<seller_profile::Model>> {
        actor.require_admin()?;
        self.store.list_seller_profiles(false).await
    }

    pub async fn approve_seller(
        &self,
        actor: &Actor,
        seller_id: &str,
        seller_type: SellerType,
    ) -> AppResult<SellerApproval> {
        let approval = self
            .cascade
            .approve_seller(actor, seller_id, seller_type)
            .await?;

        self.notifications.dispatch(Notification::new(
            NotificationKind::SellerApproved,
            &approval.owner.email,
            &approval.owner.full_name,
            json!({
                "sellerId": approval.seller.id,
                "businessName": approval.seller.business_name,
                "sellerType": seller_type,
            }),
        ));
        Ok(approval)
    }

    pub async fn retype_seller(
        &self,
        actor: &Actor,
        seller_id: &str,
        seller_type: SellerType,
    ) -> AppResult<SellerRetype> {
        self.cascade.retype_seller(actor, seller_id, seller_type).await
    }

    pub async fn remove_seller(
        &self,
        actor: &Actor,
        seller_id: &str,
    ) -> AppResult<seller_profile::Model> {
        self.cascade.remove_seller(actor, seller_id).await
    }

    /// Products waiting for review.
    pub async fn pending_products(
        &self,
        actor: &Actor,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> AppResult<Vec<product::Model>> {
        actor.require_admin()?;
        self.store
            .list_products(&ProductFilter {
                visibility: ProductVisibility::PendingReview,
                limit: limit.unwrap_or(20).min(100),
                offset: offset.unwrap_or(0),
                ..Default::default()
            })
            .await
    }

    /// Every product that has not been removed.
    pub async fn all_products(
        &self,
        actor: &Actor,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> AppResult<Vec<product::Model>> {
        actor.require_admin()?;
        self.store
            .list_products(&ProductFilter {
                visibility: ProductVisibility::NotDeleted,
                limit: limit.unwrap_or(20).min(100),
                offset: offset.unwrap_or(0),
                ..Default::default()
            })
            .await
    }

    pub async fn approve_product(&self, actor: &Actor, product_id: &str) -> AppResult<product::Model> {
        actor.require_admin()?;

        let mut tx = self.store.begin().await?;
        let product = tx
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        let set = plan_approve_product(&product, now())?;
        tx.apply(&set).await?;

        let approved = tx
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        tx.commit().await?;

        info!(product_id = %product_id, admin_id = %actor.user_id, "Product approved");

        let seller = self.store.find_seller_profile(&approved.seller_id).await?;
        let owner = match &seller {
            Some(s) => self.store.find_user(&s.user_id).await?,
            None => None,
        };

        if let (Some(seller), Some(owner)) = (seller, owner) {
            self.notifications.dispatch(Notification::new(
                NotificationKind::ProductApproved,
                owner.email,
                seller.business_name,
                json!({ "productId": approved.id, "productName": approved.name }),
            ));
        }
        Ok(approved)
    }

    pub async fn remove_product(&self, actor: &Actor, product_id: &str) -> AppResult<()> {
        actor.require_admin()?;
        self.cascade.remove_product(actor, product_id).await
    }
}
