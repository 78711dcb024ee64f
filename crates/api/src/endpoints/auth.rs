//! Authentication endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use fanforge_common::AppResult;
use fanforge_core::{RegisterInput, SigninInput};
use fanforge_db::entities::{UserRole, user};
use serde::Serialize;

use super::sellers::SellerResponse;
use crate::{
    extractors::AuthActor,
    middleware::AppState,
    response::{self, ApiResponse},
};

/// User response. Never carries the password hash or the token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub role: UserRole,
    pub is_super_admin: bool,
    pub is_deleted: bool,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone_number: user.phone_number,
            address: user.address,
            role: user.role,
            is_super_admin: user.is_super_admin,
            is_deleted: user.is_deleted,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Create a buyer account.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.auth_service.register(req).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Signin response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub token: String,
    pub user: UserResponse,
}

async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninInput>,
) -> AppResult<ApiResponse<SigninResponse>> {
    let session = state.auth_service.signin(req).await?;

    Ok(ApiResponse::ok(SigninResponse {
        token: session.token,
        user: session.user.into(),
    }))
}

/// Sign out, invalidating the current token.
async fn signout(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    state.auth_service.signout(&actor).await?;
    Ok(response::ok())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserResponse,
    pub seller: Option<SellerResponse>,
}

async fn me(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MeResponse>> {
    let me = state.auth_service.me(&actor).await?;

    Ok(ApiResponse::ok(MeResponse {
        user: me.user.into(),
        seller: me.seller.map(Into::into),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/me", post(me))
}
