//! User administration.

use fanforge_common::{AppError, AppResult};
use fanforge_db::entities::{UserRole, seller_profile, user};
use fanforge_db::repositories::UserFilter;
use fanforge_db::{Mutation, MutationSet, Store};
use tracing::info;

use crate::actor::Actor;
use crate::cascade::{CascadeEngine, now};
use crate::services::auth::{AuthService, RegisterInput};

/// One page of users.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<user::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl UserPage {
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }
}

/// A user with their seller profile.
#[derive(Debug, Clone)]
pub struct UserDetail {
    pub user: user::Model,
    pub seller: Option<seller_profile::Model>,
}

/// Admin-only account management.
#[derive(Clone)]
pub struct AdminService {
    store: Store,
    auth: AuthService,
    cascade: CascadeEngine,
}

impl AdminService {
    #[must_use]
    pub const fn new(store: Store, auth: AuthService, cascade: CascadeEngine) -> Self {
        Self {
            store,
            auth,
            cascade,
        }
    }

    /// Active users, newest first. `page` starts at 1.
    pub async fn list_users(
        &self,
        actor: &Actor,
        role: Option<UserRole>,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> AppResult<UserPage> {
        actor.require_admin()?;

        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(20).clamp(1, 100);
        let filter = UserFilter {
            role,
            limit,
            offset: (page - 1) * limit,
        };

        let users = self.store.list_users(&filter).await?;
        let total = self.store.count_users(&filter).await?;
        Ok(UserPage {
            users,
            total,
            page,
            limit,
        })
    }

    pub async fn get_user(&self, actor: &Actor, user_id: &str) -> AppResult<UserDetail> {
        actor.require_admin()?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let seller = self.store.find_seller_profile_by_user(user_id).await?;
        Ok(UserDetail { user, seller })
    }

    pub async fn ban_user(&self, actor: &Actor, user_id: &str) -> AppResult<user::Model> {
        self.cascade.ban_user(actor, user_id).await
    }

    /// Create another admin. Super admins only.
    pub async fn add_admin(&self, actor: &Actor, input: RegisterInput) -> AppResult<user::Model> {
        actor.require_super_admin()?;
        let admin = self.auth.create_user(input, UserRole::Admin, "add_admin").await?;
        info!(user_id = %admin.id, super_admin_id = %actor.user_id, "Admin added");
        Ok(admin)
    }

    /// Deactivate an admin account. Super admins only.
    pub async fn remove_admin(&self, actor: &Actor, user_id: &str) -> AppResult<()> {
        actor.require_super_admin()?;

        let mut tx = self.store.begin().await?;
        let target = tx
            .user(user_id)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if target.role != UserRole::Admin {
            return Err(AppError::InvalidState("User is not an admin".to_string()));
        }
        if target.is_super_admin {
            return Err(AppError::Forbidden("Cannot remove super admin".to_string()));
        }

        let set = MutationSet::new("remove_admin", now()).with(Mutation::SoftDeleteUser {
            user_id: target.id.clone(),
        });
        tx.apply(&set).await?;
        tx.commit().await?;

        info!(user_id = %user_id, super_admin_id = %actor.user_id, "Admin removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};

    fn root() -> Actor {
        Actor {
            user_id: "root".to_string(),
            role: UserRole::Admin,
            is_super_admin: true,
        }
    }

    #[tokio::test]
    async fn test_list_users_pages_and_counts() {
        let fx = Fixture::new().await;
        for id in ["u1", "u2", "u3"] {
            fx.seed_user(id, UserRole::Buyer).await;
        }
        fx.seed_user("s1", UserRole::Seller).await;

        let page = fx
            .admin
            .list_users(&testing::admin_actor(), Some(UserRole::Buyer), Some(2), Some(2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_admin_cannot_ban_self() {
        let fx = Fixture::new().await;
        fx.seed_user("admin", UserRole::Admin).await;

        let result = fx.admin.ban_user(&testing::admin_actor(), "admin").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_add_and_remove_admin() {
        let fx = Fixture::new().await;

        let denied = fx
            .admin
            .add_admin(&testing::admin_actor(), testing::register_input("new@example.com"))
            .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let admin = fx
            .admin
            .add_admin(&root(), testing::register_input("new@example.com"))
            .await
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(!admin.is_super_admin);

        fx.admin.remove_admin(&root(), &admin.id).await.unwrap();
        let stored = fx.store.find_user(&admin.id).await.unwrap().unwrap();
        assert!(stored.is_deleted);
    }

    #[tokio::test]
    async fn test_remove_admin_rejects_non_admin() {
        let fx = Fixture::new().await;
        fx.seed_user("b1", UserRole::Buyer).await;

        let result = fx.admin.remove_admin(&root(), "b1").await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
