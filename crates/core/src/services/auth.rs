//! Accounts and sign-in.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use fanforge_common::{AppError, AppResult, IdGenerator};
use fanforge_db::entities::{UserRole, seller_profile, user};
use fanforge_db::{Mutation, MutationSet, Store};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::actor::Actor;
use crate::cascade::now;

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,

    #[validate(length(min = 2, max = 128))]
    pub full_name: String,

    #[validate(length(min = 10, max = 32))]
    pub phone_number: String,

    #[validate(length(min = 5, max = 512))]
    pub address: String,
}

/// Input for signing in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SigninInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: user::Model,
}

/// The signed-in user with a summary of their seller profile.
#[derive(Debug, Clone)]
pub struct Me {
    pub user: user::Model,
    pub seller: Option<seller_profile::Model>,
}

/// Registration, sign-in and token authentication.
#[derive(Clone)]
pub struct AuthService {
    store: Store,
    id_gen: IdGenerator,
}

impl AuthService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a buyer account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        self.create_user(input, UserRole::Buyer, "register").await
    }

    /// Create an account with the given role.
    pub(crate) async fn create_user(
        &self,
        input: RegisterInput,
        role: UserRole,
        label: &'static str,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::AlreadyExists(
                "Email already registered".to_string(),
            ));
        }

        let at = now();
        let user = user::Model {
            id: self.id_gen.generate(),
            email,
            password: hash_password(&input.password)?,
            full_name: input.full_name,
            phone_number: input.phone_number,
            address: input.address,
            role,
            is_super_admin: false,
            token: None,
            is_deleted: false,
            deleted_at: None,
            created_at: at,
            updated_at: None,
        };

        let set = MutationSet::new(label, at).with(Mutation::InsertUser(user.clone()));
        let mut tx = self.store.begin().await?;
        tx.apply(&set).await?;
        tx.commit().await?;

        info!(user_id = %user.id, role = ?role, "User created");
        Ok(user)
    }

    /// Check credentials and issue a fresh bearer token.
    pub async fn signin(&self, input: SigninInput) -> AppResult<Session> {
        input.validate()?;

        let mut user = self
            .store
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.is_deleted {
            return Err(AppError::Forbidden(
                "Account has been deactivated".to_string(),
            ));
        }
        if !verify_password(&input.password, &user.password)? {
            return Err(AppError::Unauthorized);
        }

        let token = self.id_gen.generate_token();
        let set = MutationSet::new("signin", now()).with(Mutation::SetUserToken {
            user_id: user.id.clone(),
            token: Some(token.clone()),
        });
        let mut tx = self.store.begin().await?;
        tx.apply(&set).await?;
        tx.commit().await?;

        user.token = Some(token.clone());
        Ok(Session { token, user })
    }

    /// Invalidate the actor's token.
    pub async fn signout(&self, actor: &Actor) -> AppResult<()> {
        let set = MutationSet::new("signout", now()).with(Mutation::SetUserToken {
            user_id: actor.user_id.clone(),
            token: None,
        });
        let mut tx = self.store.begin().await?;
        tx.apply(&set).await?;
        tx.commit().await
    }

    /// Resolve a bearer token to the caller's identity.
    pub async fn authenticate(&self, token: &str) -> AppResult<Actor> {
        let user = self
            .store
            .find_user_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.is_deleted {
            return Err(AppError::Unauthorized);
        }
        Ok(Actor::from_user(&user))
    }

    pub async fn me(&self, actor: &Actor) -> AppResult<Me> {
        let user = self
            .store
            .find_user(&actor.user_id)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let seller = self
            .store
            .find_seller_profile_by_user(&user.id)
            .await?
            .filter(|s| !s.is_deleted);

        Ok(Me { user, seller })
    }
}

/// Hash a password using Argon2.
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
