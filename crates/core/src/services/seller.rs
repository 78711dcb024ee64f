//! Seller applications and profiles.

use fanforge_common::{AppError, AppResult, IdGenerator};
use fanforge_db::entities::{UserRole, seller_profile};
use fanforge_db::mutation::SellerDetailsChanges;
use fanforge_db::{Mutation, MutationSet, Store, StoreTransaction};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::actor::Actor;
use crate::approval::seller_can_transact;
use crate::cascade::now;

/// Payment methods a seller may offer.
pub const PAYMENT_METHODS: [&str; 7] = [
    "Cash on Delivery",
    "Bank Transfer",
    "UPI",
    "PayPal",
    "Venmo",
    "Stripe",
    "Other",
];

fn validate_payment_methods(methods: &[String]) -> Result<(), ValidationError> {
    if methods.iter().all(|m| PAYMENT_METHODS.contains(&m.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_payment_method"))
    }
}

/// Input for applying to become a seller.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyInput {
    #[validate(length(min = 2, max = 128))]
    pub business_name: String,

    #[validate(length(min = 10, max = 4096))]
    pub business_description: String,

    #[validate(length(min = 1), custom(function = "validate_payment_methods"))]
    pub payment_methods: Vec<String>,

    #[validate(range(min = 1))]
    pub average_shipping_cost_cents: i64,

    #[validate(range(min = 1, max = 365))]
    pub estimated_delivery_days: i32,

    #[validate(length(min = 5, max = 2048))]
    pub shipping_regions: String,

    #[validate(length(max = 2048))]
    pub social_links: Option<String>,
}

/// Input for editing one's own seller profile. Absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSellerInput {
    #[validate(length(min = 2, max = 128))]
    pub business_name: Option<String>,

    #[validate(length(min = 10, max = 4096))]
    pub business_description: Option<String>,

    #[validate(length(min = 1), custom(function = "validate_payment_methods"))]
    pub payment_methods: Option<Vec<String>>,

    #[validate(range(min = 1))]
    pub average_shipping_cost_cents: Option<i64>,

    #[validate(range(min = 1, max = 365))]
    pub estimated_delivery_days: Option<i32>,

    #[validate(length(min = 5, max = 2048))]
    pub shipping_regions: Option<String>,

    #[validate(length(max = 2048))]
    pub social_links: Option<String>,
}

impl From<UpdateSellerInput> for SellerDetailsChanges {
    fn from(input: UpdateSellerInput) -> Self {
        Self {
            business_name: input.business_name,
            business_description: input.business_description,
            payment_methods: input.payment_methods,
            average_shipping_cost_cents: input.average_shipping_cost_cents,
            estimated_delivery_days: input.estimated_delivery_days,
            shipping_regions: input.shipping_regions,
            social_links: input.social_links,
        }
    }
}

/// The actor's own profile, if it may sell.
pub(crate) async fn transacting_seller(
    tx: &mut dyn StoreTransaction,
    actor: &Actor,
) -> AppResult<seller_profile::Model> {
    if actor.role != UserRole::Seller {
        return Err(AppError::Forbidden("Seller access required".to_string()));
    }
    tx.seller_profile_by_user(&actor.user_id)
        .await?
        .filter(seller_can_transact)
        .ok_or_else(|| {
            AppError::Forbidden("Seller account not approved or deactivated".to_string())
        })
}

/// Same check outside a transaction, for read paths.
pub(crate) async fn transacting_seller_readonly(
    store: &Store,
    actor: &Actor,
) -> AppResult<seller_profile::Model> {
    if actor.role != UserRole::Seller {
        return Err(AppError::Forbidden("Seller access required".to_string()));
    }
    store
        .find_seller_profile_by_user(&actor.user_id)
        .await?
        .filter(seller_can_transact)
        .ok_or_else(|| {
            AppError::Forbidden("Seller account not approved or deactivated".to_string())
        })
}

/// Seller applications and profile maintenance.
#[derive(Clone)]
pub struct SellerService {
    store: Store,
    id_gen: IdGenerator,
}

impl SellerService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit a seller application. It stays unapproved until an admin acts.
    pub async fn apply(&self, actor: &Actor, input: ApplyInput) -> AppResult<seller_profile::Model> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        if let Some(existing) = tx.seller_profile_by_user(&actor.user_id).await? {
            let message = if existing.is_approved {
                "You are already an approved seller"
            } else {
                "Your seller application is pending approval"
            };
            return Err(AppError::AlreadyExists(message.to_string()));
        }

        let at = now();
        let profile = seller_profile::Model {
            id: self.id_gen.generate(),
            user_id: actor.user_id.clone(),
            business_name: input.business_name,
            business_description: input.business_description,
            payment_methods: serde_json::json!(input.payment_methods),
            average_shipping_cost_cents: input.average_shipping_cost_cents,
            estimated_delivery_days: input.estimated_delivery_days,
            shipping_regions: input.shipping_regions,
            social_links: input.social_links,
            is_approved: false,
            seller_type: None,
            is_deleted: false,
            deleted_at: None,
            created_at: at,
            updated_at: None,
        };

        let set = MutationSet::new("apply_seller", at)
            .with(Mutation::InsertSellerProfile(profile.clone()));
        tx.apply(&set).await?;
        tx.commit().await?;

        info!(seller_id = %profile.id, user_id = %actor.user_id, "Seller application submitted");
        Ok(profile)
    }

    pub async fn get_own(&self, actor: &Actor) -> AppResult<seller_profile::Model> {
        self.store
            .find_seller_profile_by_user(&actor.user_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::NotFound("Seller profile not found".to_string()))
    }

    pub async fn update_own(
        &self,
        actor: &Actor,
        input: UpdateSellerInput,
    ) -> AppResult<seller_profile::Model> {
        input.validate()?;

        let changes = SellerDetailsChanges::from(input);
        if changes.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let profile = tx
            .seller_profile_by_user(&actor.user_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::NotFound("Seller profile not found".to_string()))?;

        let set = MutationSet::new("update_seller", now()).with(Mutation::UpdateSellerDetails {
            seller_id: profile.id.clone(),
            changes,
        });
        tx.apply(&set).await?;
        let updated = tx
            .seller_profile(&profile.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Seller profile not found".to_string()))?;
        tx.commit().await?;

        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};

    #[tokio::test]
    async fn test_apply_creates_pending_profile() {
        let fx = Fixture::new().await;
        fx.seed_user("u1", UserRole::Buyer).await;
        let actor = testing::actor("u1", UserRole::Buyer);

        let profile = fx.sellers.apply(&actor, testing::apply_input()).await.unwrap();
        assert!(!profile.is_approved);
        assert_eq!(profile.seller_type, None);
        assert_eq!(profile.user_id, "u1");

        let again = fx.sellers.apply(&actor, testing::apply_input()).await;
        match again {
            Err(AppError::AlreadyExists(message)) => assert!(message.contains("pending")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_apply_rejects_unknown_payment_method() {
        let fx = Fixture::new().await;
        fx.seed_user("u1", UserRole::Buyer).await;
        let mut input = testing::apply_input();
        input.payment_methods = vec!["Gold bars".to_string()];

        let result = fx.sellers.apply(&testing::actor("u1", UserRole::Buyer), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_own_requires_fields() {
        let fx = Fixture::new().await;
        fx.seed_user("u1", UserRole::Seller).await;
        fx.seed_seller("sp1", "u1", true).await;
        let actor = testing::actor("u1", UserRole::Seller);

        let empty = fx.sellers.update_own(&actor, UpdateSellerInput::default()).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));

        let updated = fx
            .sellers
            .update_own(
                &actor,
                UpdateSellerInput {
                    business_name: Some("New Name".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.business_name, "New Name");
        assert!(updated.is_approved);
    }

    #[tokio::test]
    async fn test_get_own_without_profile() {
        let fx = Fixture::new().await;
        let result = fx.sellers.get_own(&testing::actor("u1", UserRole::Buyer)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
