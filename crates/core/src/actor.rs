//! The authenticated caller.

use fanforge_common::{AppError, AppResult};
use fanforge_db::entities::{UserRole, user};
use serde::Serialize;

/// Verified identity handed to every service call.
///
/// Built once per request by the authentication layer. Services never look
/// up "the current user" on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: UserRole,
    pub is_super_admin: bool,
}

impl Actor {
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
            is_super_admin: user.is_super_admin,
        }
    }

    /// Super admins count as admins whatever their stored role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin || self.is_super_admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    pub fn require_super_admin(&self) -> AppResult<()> {
        if self.is_super_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Super admin access required".to_string()))
        }
    }

    pub fn require_role(&self, role: UserRole) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}
