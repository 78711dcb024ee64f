//! Seller profile repository.

use std::sync::Arc;

use crate::entities::{SellerProfile, seller_profile};
use fanforge_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Seller profile repository for database operations.
#[derive(Clone)]
pub struct SellerProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl SellerProfileRepository {
    /// Create a new seller profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by ID, including soft-deleted profiles.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<seller_profile::Model>> {
        SellerProfile::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the profile owned by a user, if any.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<seller_profile::Model>> {
        SellerProfile::find()
            .filter(seller_profile::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find profiles by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<seller_profile::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        SellerProfile::find()
            .filter(seller_profile::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List non-deleted profiles, newest first. `pending_only` narrows to
    /// unapproved applications.
    pub async fn list(&self, pending_only: bool) -> AppResult<Vec<seller_profile::Model>> {
        let mut query = SellerProfile::find().filter(seller_profile::Column::IsDeleted.eq(false));
        if pending_only {
            query = query.filter(seller_profile::Column::IsApproved.eq(false));
        }

        query
            .order_by_desc(seller_profile::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
