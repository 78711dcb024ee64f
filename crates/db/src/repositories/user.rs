//! User repository.

use std::sync::Arc;

use crate::entities::{User, UserRole, user};
use fanforge_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

/// Admin user listing filter. Soft-deleted users are never listed.
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            role: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID, including soft-deleted users.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email (case-insensitive on the caller side).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn filtered(filter: &UserFilter) -> Select<User> {
        let mut query = User::find().filter(user::Column::IsDeleted.eq(false));
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role));
        }
        query
    }

    /// List non-deleted users, newest first.
    pub async fn list(&self, filter: &UserFilter) -> AppResult<Vec<user::Model>> {
        Self::filtered(filter)
            .order_by_desc(user::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count non-deleted users matching the filter, ignoring pagination.
    pub async fn count(&self, filter: &UserFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
