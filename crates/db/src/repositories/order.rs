//! Order repository.

use std::sync::Arc;

use crate::entities::{Order, OrderStatus, order};
use fanforge_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Order listing filter.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            buyer_id: None,
            seller_id: None,
            status: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// Order repository for database operations.
#[derive(Clone)]
pub struct OrderRepository {
    db: Arc<DatabaseConnection>,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an order by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<order::Model>> {
        Order::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List orders matching the filter, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<order::Model>> {
        let mut query = Order::find();

        if let Some(buyer_id) = &filter.buyer_id {
            query = query.filter(order::Column::BuyerId.eq(buyer_id.as_str()));
        }
        if let Some(seller_id) = &filter.seller_id {
            query = query.filter(order::Column::SellerId.eq(seller_id.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }

        query
            .order_by_desc(order::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
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

    fn create_test_order(id: &str, status: OrderStatus) -> order::Model {
        order::Model {
            id: id.to_string(),
            buyer_id: "buyer1".to_string(),
            seller_id: "sp1".to_string(),
            product_id: "p1".to_string(),
            buyer_address: "1 Test Street".to_string(),
            buyer_phone: "0123456789".to_string(),
            buyer_notes: None,
            status,
            is_cancelled: status == OrderStatus::Cancelled,
            cancellation_reason: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let order = create_test_order("o1", OrderStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[order]])
                .into_connection(),
        );

        let repo = OrderRepository::new(db);
        let result = repo.find_by_id("o1").await.unwrap().unwrap();

        assert_eq!(result.status, OrderStatus::Accepted);
        assert!(!result.is_cancelled);
    }

    #[tokio::test]
    async fn test_list_for_buyer() {
        let o1 = create_test_order("o1", OrderStatus::Pending);
        let o2 = create_test_order("o2", OrderStatus::Cancelled);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[o1, o2]])
                .into_connection(),
        );

        let repo = OrderRepository::new(db);
        let filter = OrderFilter {
            buyer_id: Some("buyer1".to_string()),
            ..Default::default()
        };
        let result = repo.list(&filter).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result[1].is_cancelled);
    }
}
