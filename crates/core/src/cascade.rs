//! Cascade engine.
//!
//! Administrative actions that reach beyond one row. Each action is split in
//! two: a pure planner that validates the loaded rows and returns the full
//! [`MutationSet`], and an engine method that loads those rows inside a
//! transaction, applies the plan, and commits. Nothing is written unless the
//! whole set applies.
//!
//! | Action         | Writes                                                         |
//! |----------------|----------------------------------------------------------------|
//! | ban user       | user, their seller profile and products, open orders both ways |
//! | remove seller  | seller profile, products, open orders as seller, owning user   |
//! | approve seller | seller profile, owning user's role                             |
//! | retype seller  | seller profile, `product_type` of every product it owns        |

use fanforge_common::{AppError, AppResult};
use fanforge_db::entities::{CancellationReason, SellerType, UserRole, product, seller_profile, user};
use fanforge_db::{Mutation, MutationSet, Store, StoreTransaction};
use sea_orm::prelude::DateTimeWithTimeZone;
use tracing::info;

use crate::actor::Actor;
use crate::services::media::MediaCleaner;

pub(crate) fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

/// Plan banning `target`.
///
/// `seller` is the target's seller profile, if any.
pub fn plan_ban_user(
    actor: &Actor,
    target: &user::Model,
    seller: Option<&seller_profile::Model>,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if target.is_deleted {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    if target.is_super_admin {
        return Err(AppError::Forbidden("Cannot ban super admin".to_string()));
    }
    if target.id == actor.user_id {
        return Err(AppError::Forbidden("You cannot ban yourself".to_string()));
    }

    let mut set = MutationSet::new("ban_user", at).with(Mutation::SoftDeleteUser {
        user_id: target.id.clone(),
    });

    if let Some(seller) = seller.filter(|s| !s.is_deleted) {
        set.push(Mutation::SoftDeleteSellerProfile {
            seller_id: seller.id.clone(),
        });
        set.push(Mutation::SoftDeleteProductsOfSeller {
            seller_id: seller.id.clone(),
        });
        set.push(Mutation::CancelOpenOrdersAsSeller {
            seller_id: seller.id.clone(),
            reason: CancellationReason::UserBanned,
        });
    }

    set.push(Mutation::CancelOpenOrdersAsBuyer {
        buyer_id: target.id.clone(),
        reason: CancellationReason::UserBanned,
    });

    Ok(set)
}

/// Plan removing a seller together with its owner.
pub fn plan_remove_seller(
    seller: &seller_profile::Model,
    owner: &user::Model,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if seller.is_deleted {
        return Err(AppError::NotFound("Seller profile not found".to_string()));
    }
    if owner.is_super_admin {
        return Err(AppError::Forbidden(
            "Cannot remove a seller owned by a super admin".to_string(),
        ));
    }

    let mut set = MutationSet::new("remove_seller", at)
        .with(Mutation::SoftDeleteSellerProfile {
            seller_id: seller.id.clone(),
        })
        .with(Mutation::SoftDeleteProductsOfSeller {
            seller_id: seller.id.clone(),
        })
        .with(Mutation::CancelOpenOrdersAsSeller {
            seller_id: seller.id.clone(),
            reason: CancellationReason::SellerRemoved,
        });

    if !owner.is_deleted {
        set.push(Mutation::SoftDeleteUser {
            user_id: owner.id.clone(),
        });
    }

    Ok(set)
}

/// Plan approving a seller application. The role flip travels in the same set.
pub fn plan_approve_seller(
    seller: &seller_profile::Model,
    owner: &user::Model,
    seller_type: SellerType,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if seller.is_deleted || owner.is_deleted {
        return Err(AppError::NotFound("Seller profile not found".to_string()));
    }
    if seller.is_approved {
        return Err(AppError::AlreadyApproved(
            "Seller is already approved".to_string(),
        ));
    }

    Ok(MutationSet::new("approve_seller", at)
        .with(Mutation::ApproveSellerProfile {
            seller_id: seller.id.clone(),
            seller_type,
        })
        .with(Mutation::SetUserRole {
            user_id: owner.id.clone(),
            role: UserRole::Seller,
        }))
}

/// Plan changing a seller's type. `product_type` is a copy of the seller's
/// type, so every product is rewritten, approved or not.
pub fn plan_retype_seller(
    seller: &seller_profile::Model,
    seller_type: SellerType,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if seller.is_deleted {
        return Err(AppError::NotFound("Seller profile not found".to_string()));
    }

    Ok(MutationSet::new("retype_seller", at)
        .with(Mutation::SetSellerType {
            seller_id: seller.id.clone(),
            seller_type,
        })
        .with(Mutation::SetProductTypeForSeller {
            seller_id: seller.id.clone(),
            product_type: seller_type,
        }))
}

pub fn plan_approve_product(
    product: &product::Model,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if product.is_deleted {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    if product.is_approved {
        return Err(AppError::AlreadyApproved(
            "Product is already approved".to_string(),
        ));
    }

    Ok(MutationSet::new("approve_product", at).with(Mutation::ApproveProduct {
        product_id: product.id.clone(),
    }))
}

pub fn plan_remove_product(
    product: &product::Model,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if product.is_deleted {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    Ok(MutationSet::new("remove_product", at).with(Mutation::SoftDeleteProduct {
        product_id: product.id.clone(),
    }))
}

/// Result of [`CascadeEngine::approve_seller`].
#[derive(Debug, Clone)]
pub struct SellerApproval {
    pub seller: seller_profile::Model,
    pub owner: user::Model,
}

/// Result of [`CascadeEngine::retype_seller`].
#[derive(Debug, Clone)]
pub struct SellerRetype {
    pub seller: seller_profile::Model,
    pub products_updated: u64,
}

/// Applies cascades against the store.
#[derive(Clone)]
pub struct CascadeEngine {
    store: Store,
    media: MediaCleaner,
}

impl CascadeEngine {
    #[must_use]
    pub const fn new(store: Store, media: MediaCleaner) -> Self {
        Self { store, media }
    }

    /// Ban a user and everything they sell or have on order.
    pub async fn ban_user(&self, actor: &Actor, user_id: &str) -> AppResult<user::Model> {
        actor.require_admin()?;

        let mut tx = self.store.begin().await?;
        let target = tx
            .user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let seller = tx.seller_profile_by_user(user_id).await?;

        let set = plan_ban_user(actor, &target, seller.as_ref(), now())?;
        let image_keys = match seller.as_ref().filter(|s| !s.is_deleted) {
            Some(s) => tx.image_keys_for_seller(&s.id).await?,
            None => Vec::new(),
        };

        let rows = tx.apply(&set).await?;
        let banned = reload_user(tx.as_mut(), user_id).await?;
        tx.commit().await?;

        info!(
            set = set.label,
            rows,
            user_id = %user_id,
            admin_id = %actor.user_id,
            "User banned"
        );
        self.media.cleanup(image_keys);
        Ok(banned)
    }

    /// Remove a seller, its products, its open orders and its owner.
    pub async fn remove_seller(
        &self,
        actor: &Actor,
        seller_id: &str,
    ) -> AppResult<seller_profile::Model> {
        actor.require_admin()?;

        let (mut tx, seller, owner) = self.lock_seller_with_owner(seller_id).await?;

        let set = plan_remove_seller(&seller, &owner, now())?;
        let image_keys = tx.image_keys_for_seller(seller_id).await?;

        let rows = tx.apply(&set).await?;
        let removed = load_seller(tx.as_mut(), seller_id).await?;
        tx.commit().await?;

        info!(
            set = set.label,
            rows,
            seller_id = %seller_id,
            admin_id = %actor.user_id,
            "Seller removed"
        );
        self.media.cleanup(image_keys);
        Ok(removed)
    }

    /// Approve a seller application and make its owner a seller.
    pub async fn approve_seller(
        &self,
        actor: &Actor,
        seller_id: &str,
        seller_type: SellerType,
    ) -> AppResult<SellerApproval> {
        actor.require_admin()?;

        let (mut tx, seller, owner) = self.lock_seller_with_owner(seller_id).await?;

        let set = plan_approve_seller(&seller, &owner, seller_type, now())?;
        let rows = tx.apply(&set).await?;

        let seller = load_seller(tx.as_mut(), seller_id).await?;
        let owner = reload_user(tx.as_mut(), &owner.id).await?;
        tx.commit().await?;

        info!(
            set = set.label,
            rows,
            seller_id = %seller_id,
            seller_type = ?seller_type,
            admin_id = %actor.user_id,
            "Seller approved"
        );
        Ok(SellerApproval { seller, owner })
    }

    /// Change a seller's type and every product's copy of it.
    pub async fn retype_seller(
        &self,
        actor: &Actor,
        seller_id: &str,
        seller_type: SellerType,
    ) -> AppResult<SellerRetype> {
        actor.require_admin()?;

        let mut tx = self.store.begin().await?;
        let seller = load_seller(tx.as_mut(), seller_id).await?;

        let set = plan_retype_seller(&seller, seller_type, now())?;
        let rows = tx.apply(&set).await?;
        let seller = load_seller(tx.as_mut(), seller_id).await?;
        tx.commit().await?;

        // One row is the profile itself.
        let products_updated = rows.saturating_sub(1);
        info!(
            set = set.label,
            rows,
            seller_id = %seller_id,
            seller_type = ?seller_type,
            products_updated,
            "Seller retyped"
        );
        Ok(SellerRetype {
            seller,
            products_updated,
        })
    }

    /// Soft-delete one product and drop its images.
    ///
    /// Owners may remove their own products; admins may remove any.
    pub async fn remove_product(&self, actor: &Actor, product_id: &str) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let own = if actor.is_admin() {
            None
        } else {
            tx.seller_profile_by_user(&actor.user_id).await?
        };
        let product = tx
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        let set = plan_remove_product(&product, now())?;

        if !actor.is_admin() && own.is_none_or(|s| s.id != product.seller_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own products".to_string(),
            ));
        }

        let image_keys = tx.image_keys_for_product(product_id).await?;
        let rows = tx.apply(&set).await?;
        tx.commit().await?;

        info!(set = set.label, rows, product_id = %product_id, actor_id = %actor.user_id, "Product removed");
        self.media.cleanup(image_keys);
        Ok(())
    }
}

impl CascadeEngine {
    /// Open a transaction holding the seller's owner and then the profile.
    ///
    /// Every transaction locks users before seller profiles before products
    /// before orders. The owner id is read unlocked first; it never changes.
    async fn lock_seller_with_owner(
        &self,
        seller_id: &str,
    ) -> AppResult<(Box<dyn StoreTransaction>, seller_profile::Model, user::Model)> {
        let owner_id = self
            .store
            .find_seller_profile(seller_id)
            .await?
            .map(|s| s.user_id)
            .ok_or_else(|| AppError::NotFound("Seller profile not found".to_string()))?;

        let mut tx = self.store.begin().await?;
        let owner = tx
            .user(&owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let seller = load_seller(tx.as_mut(), seller_id).await?;
        Ok((tx, seller, owner))
    }
}

async fn load_seller(
    tx: &mut dyn StoreTransaction,
    seller_id: &str,
) -> AppResult<seller_profile::Model> {
    tx.seller_profile(seller_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Seller profile not found".to_string()))
}

async fn reload_user(tx: &mut dyn StoreTransaction, user_id: &str) -> AppResult<user::Model> {
    tx.user(user_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("User {user_id} vanished mid-transaction")))
}
