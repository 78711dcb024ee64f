//! Administration endpoints.
//!
//! The services check the caller's rights; every route here only needs a
//! signed-in caller.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use fanforge_common::AppResult;
use fanforge_core::{CreateCategoryInput, RegisterInput, UpdateCategoryInput, UserPage};
use fanforge_db::entities::{SellerType, UserRole, seller_profile};
use serde::{Deserialize, Serialize};

use super::{
    auth::UserResponse,
    categories::{CategoryCountResponse, CategoryResponse},
    products::{PageRequest, ProductIdRequest, ProductResponse, to_list},
    sellers::SellerResponse,
};
use crate::{
    extractors::AuthActor,
    middleware::AppState,
    response::{self, ApiResponse},
};

// === Users ===

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersRequest {
    pub role: Option<UserRole>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl From<UserPage> for UserPageResponse {
    fn from(page: UserPage) -> Self {
        let total_pages = page.total_pages();
        Self {
            users: page.users.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

async fn list_users(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ListUsersRequest>,
) -> AppResult<ApiResponse<UserPageResponse>> {
    let page = state
        .admin_service
        .list_users(&actor, req.role, req.page, req.limit)
        .await?;
    Ok(ApiResponse::ok(page.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailResponse {
    pub user: UserResponse,
    pub seller: Option<SellerResponse>,
}

async fn show_user(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<UserDetailResponse>> {
    let detail = state.admin_service.get_user(&actor, &req.user_id).await?;
    Ok(ApiResponse::ok(UserDetailResponse {
        user: detail.user.into(),
        seller: detail.seller.map(Into::into),
    }))
}

/// Ban a user: their shop, products and open orders go with them.
async fn ban_user(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.admin_service.ban_user(&actor, &req.user_id).await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn add_admin(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.admin_service.add_admin(&actor, req).await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn remove_admin(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<StatusCode> {
    state
        .admin_service
        .remove_admin(&actor, &req.user_id)
        .await?;
    Ok(response::ok())
}

// === Sellers ===

fn to_sellers(sellers: Vec<seller_profile::Model>) -> Vec<SellerResponse> {
    sellers.into_iter().map(Into::into).collect()
}

async fn pending_sellers(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<SellerResponse>>> {
    let sellers = state.moderation_service.pending_sellers(&actor).await?;
    Ok(ApiResponse::ok(to_sellers(sellers)))
}

async fn list_sellers(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<SellerResponse>>> {
    let sellers = state.moderation_service.all_sellers(&actor).await?;
    Ok(ApiResponse::ok(to_sellers(sellers)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerTypeRequest {
    pub seller_id: String,
    pub seller_type: SellerType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveSellerResponse {
    pub seller: SellerResponse,
    pub owner: UserResponse,
}

/// Approve an application. The owner becomes a seller.
async fn approve_seller(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<SellerTypeRequest>,
) -> AppResult<ApiResponse<ApproveSellerResponse>> {
    let approval = state
        .moderation_service
        .approve_seller(&actor, &req.seller_id, req.seller_type)
        .await?;
    Ok(ApiResponse::ok(ApproveSellerResponse {
        seller: approval.seller.into(),
        owner: approval.owner.into(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetypeSellerResponse {
    pub seller: SellerResponse,
    pub products_updated: u64,
}

/// Change a seller's type and every product's copy of it.
async fn retype_seller(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<SellerTypeRequest>,
) -> AppResult<ApiResponse<RetypeSellerResponse>> {
    let retype = state
        .moderation_service
        .retype_seller(&actor, &req.seller_id, req.seller_type)
        .await?;
    Ok(ApiResponse::ok(RetypeSellerResponse {
        seller: retype.seller.into(),
        products_updated: retype.products_updated,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerIdRequest {
    pub seller_id: String,
}

/// Remove a seller, their products, open orders and account.
async fn remove_seller(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<SellerIdRequest>,
) -> AppResult<ApiResponse<SellerResponse>> {
    let seller = state
        .moderation_service
        .remove_seller(&actor, &req.seller_id)
        .await?;
    Ok(ApiResponse::ok(seller.into()))
}

// === Products ===

async fn pending_products(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<ProductResponse>>> {
    let products = state
        .moderation_service
        .pending_products(&actor, req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(to_list(products)))
}

async fn list_products(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<ProductResponse>>> {
    let products = state
        .moderation_service
        .all_products(&actor, req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(to_list(products)))
}

async fn approve_product(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ProductIdRequest>,
) -> AppResult<ApiResponse<ProductResponse>> {
    let product = state
        .moderation_service
        .approve_product(&actor, &req.product_id)
        .await?;
    Ok(ApiResponse::ok(product.into()))
}

async fn remove_product(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ProductIdRequest>,
) -> AppResult<StatusCode> {
    state
        .moderation_service
        .remove_product(&actor, &req.product_id)
        .await?;
    Ok(response::ok())
}

// === Categories ===

async fn create_category(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryInput>,
) -> AppResult<ApiResponse<CategoryResponse>> {
    let category = state.category_service.create(&actor, req).await?;
    Ok(ApiResponse::ok(category.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub category_id: String,
    #[serde(flatten)]
    pub changes: UpdateCategoryInput,
}

async fn update_category(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UpdateCategoryRequest>,
) -> AppResult<ApiResponse<CategoryResponse>> {
    let category = state
        .category_service
        .update(&actor, &req.category_id, req.changes)
        .await?;
    Ok(ApiResponse::ok(category.into()))
}

async fn list_categories(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CategoryCountResponse>>> {
    let categories = state.category_service.list_for_admin(&actor).await?;
    Ok(ApiResponse::ok(
        categories.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/list", post(list_users))
        .route("/users/show", post(show_user))
        .route("/users/ban", post(ban_user))
        .route("/admins/add", post(add_admin))
        .route("/admins/remove", post(remove_admin))
        .route("/sellers/pending", post(pending_sellers))
        .route("/sellers/list", post(list_sellers))
        .route("/sellers/approve", post(approve_seller))
        .route("/sellers/retype", post(retype_seller))
        .route("/sellers/remove", post(remove_seller))
        .route("/products/pending", post(pending_products))
        .route("/products/list", post(list_products))
        .route("/products/approve", post(approve_product))
        .route("/products/remove", post(remove_product))
        .route("/categories/list", post(list_categories))
        .route("/categories/create", post(create_category))
        .route("/categories/update", post(update_category))
}
