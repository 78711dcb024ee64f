//! Product listings.

use fanforge_common::{AppError, AppResult, IdGenerator};
use fanforge_db::entities::{SellerType, product, product_image, seller_profile};
use fanforge_db::mutation::ProductChanges;
use fanforge_db::repositories::{ProductFilter, ProductVisibility};
use fanforge_db::{Mutation, MutationSet, Store};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::actor::Actor;
use crate::approval::can_view_product;
use crate::cascade::{CascadeEngine, now};
use crate::services::media::is_valid_key;
use crate::services::seller::{transacting_seller, transacting_seller_readonly};

/// Most images a product may carry.
pub const MAX_IMAGES: usize = 5;

fn validate_image_key(key: &str) -> Result<(), ValidationError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_image_key"))
    }
}

/// An image already uploaded to the image store.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    #[validate(length(min = 1, max = 2048))]
    pub url: String,

    /// Image store key, relative to the store root.
    #[validate(length(min = 1, max = 512), custom(function = "validate_image_key"))]
    pub public_id: String,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 2, max = 256))]
    pub name: String,

    #[validate(length(min = 10, max = 8192))]
    pub description: String,

    #[validate(range(min = 1))]
    pub price_cents: i64,

    #[validate(length(min = 1))]
    pub category_id: String,

    #[validate(nested)]
    pub images: Vec<ImageInput>,
}

/// Input for editing a product. Absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    #[validate(length(min = 2, max = 256))]
    pub name: Option<String>,

    #[validate(length(min = 10, max = 8192))]
    pub description: Option<String>,

    #[validate(range(min = 1))]
    pub price_cents: Option<i64>,

    pub category_id: Option<String>,
}

impl From<UpdateProductInput> for ProductChanges {
    fn from(input: UpdateProductInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            category_id: input.category_id,
        }
    }
}

/// Public listing query.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category_id: Option<String>,
    pub product_type: Option<SellerType>,
    pub seller_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A product with its images and seller.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
    pub seller: seller_profile::Model,
}

/// Seller-side product management and public browsing.
#[derive(Clone)]
pub struct ProductService {
    store: Store,
    cascade: CascadeEngine,
    id_gen: IdGenerator,
}

impl ProductService {
    #[must_use]
    pub const fn new(store: Store, cascade: CascadeEngine) -> Self {
        Self {
            store,
            cascade,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a product awaiting approval. It inherits the seller's type.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateProductInput,
    ) -> AppResult<ProductDetail> {
        input.validate()?;
        if input.images.is_empty() || input.images.len() > MAX_IMAGES {
            return Err(AppError::Validation(format!(
                "A product needs between 1 and {MAX_IMAGES} images"
            )));
        }

        let mut tx = self.store.begin().await?;
        let seller = transacting_seller(tx.as_mut(), actor).await?;
        tx.category(&input.category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        let at = now();
        let product_id = self.id_gen.generate();
        let images: Vec<product_image::Model> = input
            .images
            .into_iter()
            .zip(0i32..)
            .map(|(image, position)| product_image::Model {
                id: self.id_gen.generate(),
                product_id: product_id.clone(),
                url: image.url,
                public_id: image.public_id,
                position,
            })
            .collect();
        let product = product::Model {
            id: product_id,
            seller_id: seller.id.clone(),
            category_id: input.category_id,
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            product_type: seller.seller_type,
            is_approved: false,
            is_deleted: false,
            deleted_at: None,
            created_at: at,
            updated_at: None,
        };

        let set = MutationSet::new("create_product", at).with(Mutation::InsertProduct {
            product: product.clone(),
            images: images.clone(),
        });
        tx.apply(&set).await?;
        tx.commit().await?;

        info!(product_id = %product.id, seller_id = %seller.id, "Product created");
        Ok(ProductDetail {
            product,
            images,
            seller,
        })
    }

    /// Edit a product. Any edit sends it back for approval.
    pub async fn update(
        &self,
        actor: &Actor,
        product_id: &str,
        input: UpdateProductInput,
    ) -> AppResult<product::Model> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let seller = transacting_seller(tx.as_mut(), actor).await?;
        let product = tx
            .product(product_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        if product.seller_id != seller.id {
            return Err(AppError::Forbidden(
                "You can only update your own products".to_string(),
            ));
        }

        if let Some(category_id) = &input.category_id {
            tx.category(category_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
        }

        let changes = ProductChanges::from(input);
        if changes.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        let set = MutationSet::new("update_product", now()).with(Mutation::UpdateProductContent {
            product_id: product.id.clone(),
            changes,
        });
        tx.apply(&set).await?;
        let updated = tx
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Soft-delete one of the actor's own products.
    pub async fn delete(&self, actor: &Actor, product_id: &str) -> AppResult<()> {
        transacting_seller_readonly(&self.store, actor).await?;
        self.cascade.remove_product(actor, product_id).await
    }

    /// Fetch a product as `viewer` is allowed to see it.
    pub async fn get(&self, viewer: Option<&Actor>, product_id: &str) -> AppResult<ProductDetail> {
        let not_found = || AppError::NotFound("Product not found".to_string());

        let product = self.store.find_product(product_id).await?.ok_or_else(not_found)?;
        let seller = self
            .store
            .find_seller_profile(&product.seller_id)
            .await?
            .ok_or_else(not_found)?;
        if !can_view_product(&seller, &product, viewer) {
            return Err(not_found());
        }

        let images = self.store.product_images(&product.id).await?;
        Ok(ProductDetail {
            product,
            images,
            seller,
        })
    }

    /// Products anyone may buy.
    pub async fn list_public(&self, query: ProductQuery) -> AppResult<Vec<product::Model>> {
        let filter = ProductFilter {
            visibility: ProductVisibility::Public,
            seller_id: query.seller_id,
            category_id: query.category_id,
            product_type: query.product_type,
            search: query.search.filter(|s| !s.trim().is_empty()),
            limit: query.limit.unwrap_or(20).min(100),
            offset: query.offset.unwrap_or(0),
        };
        self.store.list_products(&filter).await
    }

    /// The actor's own products, approved or not.
    pub async fn list_own(
        &self,
        actor: &Actor,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> AppResult<Vec<product::Model>> {
        let seller = transacting_seller_readonly(&self.store, actor).await?;
        let filter = ProductFilter {
            visibility: ProductVisibility::NotDeleted,
            seller_id: Some(seller.id),
            limit: limit.unwrap_or(100).min(100),
            offset: offset.unwrap_or(0),
            ..Default::default()
        };
        self.store.list_products(&filter).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};
    use fanforge_db::entities::UserRole;

    #[tokio::test]
    async fn test_create_inherits_seller_type_and_awaits_approval() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_category("c1").await;

        let detail = fx
            .products
            .create(&testing::actor("s1", UserRole::Seller), testing::create_product_input("c1"))
            .await
            .unwrap();

        assert!(!detail.product.is_approved);
        assert_eq!(detail.product.product_type, Some(SellerType::FanMade));
        assert_eq!(detail.images.len(), 1);
        assert_eq!(detail.images[0].position, 0);
    }

    #[tokio::test]
    async fn test_create_requires_approved_seller_and_category() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", false).await;
        fx.seed_category("c1").await;
        let actor = testing::actor("s1", UserRole::Seller);

        let result = fx.products.create(&actor, testing::create_product_input("c1")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        fx.seed_user("s2", UserRole::Seller).await;
        fx.seed_seller("sp2", "s2", true).await;
        let result = fx
            .products
            .create(&testing::actor("s2", UserRole::Seller), testing::create_product_input("nope"))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_limits_images() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_category("c1").await;

        let mut input = testing::create_product_input("c1");
        input.images = Vec::new();
        let result = fx.products.create(&testing::actor("s1", UserRole::Seller), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_escaping_image_keys() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_category("c1").await;

        for key in ["../outside.jpg", "/etc/passwd", "products/../../x.jpg"] {
            let mut input = testing::create_product_input("c1");
            input.images[0].public_id = key.to_string();
            let result = fx.products.create(&testing::actor("s1", UserRole::Seller), input).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{key}");
        }
        let own = fx
            .products
            .list_own(&testing::actor("s1", UserRole::Seller), None, None)
            .await
            .unwrap();
        assert!(own.is_empty());
    }

    #[tokio::test]
    async fn test_edit_clears_approval() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_product("p1", "sp1", true).await;
        let actor = testing::actor("s1", UserRole::Seller);

        let updated = fx
            .products
            .update(
                &actor,
                "p1",
                UpdateProductInput {
                    price_cents: Some(2500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 2500);
        assert!(!updated.is_approved);

        let empty = fx.products.update(&actor, "p1", UpdateProductInput::default()).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_only_owner_can_edit_or_delete() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_product("p1", "sp1", true).await;
        fx.seed_user("s2", UserRole::Seller).await;
        fx.seed_seller("sp2", "s2", true).await;
        let other = testing::actor("s2", UserRole::Seller);

        let edit = fx
            .products
            .update(
                &other,
                "p1",
                UpdateProductInput {
                    name: Some("Stolen".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(edit, Err(AppError::Forbidden(_))));

        let delete = fx.products.delete(&other, "p1").await;
        assert!(matches!(delete, Err(AppError::Forbidden(_))));

        fx.products
            .delete(&testing::actor("s1", UserRole::Seller), "p1")
            .await
            .unwrap();
        let deleted = fx.store.find_product("p1").await.unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(fx.images.wait_for(1).await, vec!["products/p1/0.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_unapproved_product_hidden_from_public() {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_product("p1", "sp1", false).await;
        fx.seed_product("p2", "sp1", true).await;

        assert!(matches!(
            fx.products.get(None, "p1").await,
            Err(AppError::NotFound(_))
        ));
        let owner = testing::actor("s1", UserRole::Seller);
        assert!(fx.products.get(Some(&owner), "p1").await.is_ok());
        assert!(fx.products.get(Some(&testing::admin_actor()), "p1").await.is_ok());

        let public = fx.products.list_public(ProductQuery::default()).await.unwrap();
        let ids: Vec<_> = public.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2"]);

        let own = fx.products.list_own(&owner, None, None).await.unwrap();
        assert_eq!(own.len(), 2);
    }
}
