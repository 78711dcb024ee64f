//! Product repository.

use std::sync::Arc;

use crate::entities::{Product, ProductImage, SellerType, product, product_image, seller_profile};
use fanforge_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, sea_query::JoinType,
};

/// Which products a listing may return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductVisibility {
    /// Approved, not deleted, and sold by an approved, non-deleted seller.
    #[default]
    Public,
    /// Not deleted and awaiting approval.
    PendingReview,
    /// Every product that is not soft-deleted.
    NotDeleted,
}

/// Product listing filter.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub visibility: ProductVisibility,
    pub seller_id: Option<String>,
    pub category_id: Option<String>,
    pub product_type: Option<SellerType>,
    /// Substring match on the product name
    pub search: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            visibility: ProductVisibility::Public,
            seller_id: None,
            category_id: None,
            product_type: None,
            search: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// Product repository for database operations.
#[derive(Clone)]
pub struct ProductRepository {
    db: Arc<DatabaseConnection>,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a product by ID, including soft-deleted products.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<product::Model>> {
        Product::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find products by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<product::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Product::find()
            .filter(product::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List products matching the filter, newest first.
    pub async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<product::Model>> {
        let mut query = Product::find().filter(product::Column::IsDeleted.eq(false));

        match filter.visibility {
            ProductVisibility::Public => {
                query = query
                    .join(JoinType::InnerJoin, product::Relation::Seller.def())
                    .filter(product::Column::IsApproved.eq(true))
                    .filter(seller_profile::Column::IsApproved.eq(true))
                    .filter(seller_profile::Column::IsDeleted.eq(false));
            }
            ProductVisibility::PendingReview => {
                query = query.filter(product::Column::IsApproved.eq(false));
            }
            ProductVisibility::NotDeleted => {}
        }

        if let Some(seller_id) = &filter.seller_id {
            query = query.filter(product::Column::SellerId.eq(seller_id.as_str()));
        }
        if let Some(category_id) = &filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id.as_str()));
        }
        if let Some(product_type) = filter.product_type {
            query = query.filter(product::Column::ProductType.eq(product_type));
        }
        if let Some(search) = &filter.search {
            query = query.filter(product::Column::Name.contains(search.as_str()));
        }

        query
            .order_by_desc(product::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Images of a product in display order.
    pub async fn find_images(&self, product_id: &str) -> AppResult<Vec<product_image::Model>> {
        ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_asc(product_image::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_product(id: &str, seller_id: &str) -> product::Model {
        product::Model {
            id: id.to_string(),
            seller_id: seller_id.to_string(),
            category_id: "c1".to_string(),
            name: "Acrylic stand".to_string(),
            description: "A nice acrylic stand".to_string(),
            price_cents: 1500,
            product_type: Some(SellerType::FanMade),
            is_approved: true,
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let product = create_test_product("p1", "sp1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[product]])
                .into_connection(),
        );

        let repo = ProductRepository::new(db);
        let result = repo.find_by_id("p1").await.unwrap().unwrap();

        assert_eq!(result.seller_id, "sp1");
    }

    #[tokio::test]
    async fn test_list_public_with_filters() {
        let p1 = create_test_product("p1", "sp1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1]])
                .into_connection(),
        );

        let repo = ProductRepository::new(db);
        let filter = ProductFilter {
            category_id: Some("c1".to_string()),
            product_type: Some(SellerType::FanMade),
            search: Some("stand".to_string()),
            ..Default::default()
        };
        let result = repo.list(&filter).await.unwrap();

        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_find_images() {
        let image = product_image::Model {
            id: "img1".to_string(),
            product_id: "p1".to_string(),
            url: "/media/a.png".to_string(),
            public_id: "a.png".to_string(),
            position: 0,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[image]])
                .into_connection(),
        );

        let repo = ProductRepository::new(db);
        let result = repo.find_images("p1").await.unwrap();

        assert_eq!(result[0].public_id, "a.png");
    }
}
