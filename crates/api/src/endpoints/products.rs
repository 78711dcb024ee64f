//! Product endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use fanforge_common::AppResult;
use fanforge_core::{CreateProductInput, ProductDetail, ProductQuery, UpdateProductInput};
use fanforge_db::entities::{SellerType, product, product_image};
use serde::{Deserialize, Serialize};

use super::sellers::SellerResponse;
use crate::{
    extractors::{AuthActor, MaybeAuthActor},
    middleware::AppState,
    response::{self, ApiResponse},
};

/// Product response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub seller_id: String,
    pub category_id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub product_type: Option<SellerType>,
    pub is_approved: bool,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<product::Model> for ProductResponse {
    fn from(product: product::Model) -> Self {
        Self {
            id: product.id,
            seller_id: product.seller_id,
            category_id: product.category_id,
            name: product.name,
            description: product.description,
            price_cents: product.price_cents,
            product_type: product.product_type,
            is_approved: product.is_approved,
            is_deleted: product.is_deleted,
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub url: String,
    pub public_id: String,
    pub position: i32,
}

impl From<product_image::Model> for ImageResponse {
    fn from(image: product_image::Model) -> Self {
        Self {
            url: image.url,
            public_id: image.public_id,
            position: image.position,
        }
    }
}

/// A product with its images and seller.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub images: Vec<ImageResponse>,
    pub seller: SellerResponse,
}

impl From<ProductDetail> for ProductDetailResponse {
    fn from(detail: ProductDetail) -> Self {
        Self {
            product: detail.product.into(),
            images: detail.images.into_iter().map(Into::into).collect(),
            seller: detail.seller.into(),
        }
    }
}

pub(super) fn to_list(products: Vec<product::Model>) -> Vec<ProductResponse> {
    products.into_iter().map(Into::into).collect()
}

/// Create a product. It stays hidden until an admin approves it.
async fn create(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<CreateProductInput>,
) -> AppResult<ApiResponse<ProductDetailResponse>> {
    let detail = state.product_service.create(&actor, req).await?;
    Ok(ApiResponse::ok(detail.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub product_id: String,
    #[serde(flatten)]
    pub changes: UpdateProductInput,
}

/// Edit a product. The edit sends it back for review.
async fn update(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UpdateProductRequest>,
) -> AppResult<ApiResponse<ProductResponse>> {
    let product = state
        .product_service
        .update(&actor, &req.product_id, req.changes)
        .await?;
    Ok(ApiResponse::ok(product.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIdRequest {
    pub product_id: String,
}

async fn delete(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ProductIdRequest>,
) -> AppResult<StatusCode> {
    state.product_service.delete(&actor, &req.product_id).await?;
    Ok(response::ok())
}

async fn show(
    MaybeAuthActor(viewer): MaybeAuthActor,
    State(state): State<AppState>,
    Json(req): Json<ProductIdRequest>,
) -> AppResult<ApiResponse<ProductDetailResponse>> {
    let detail = state
        .product_service
        .get(viewer.as_ref(), &req.product_id)
        .await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Public listing filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsRequest {
    pub category_id: Option<String>,
    pub product_type: Option<SellerType>,
    pub seller_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListProductsRequest>,
) -> AppResult<ApiResponse<Vec<ProductResponse>>> {
    let products = state
        .product_service
        .list_public(ProductQuery {
            category_id: req.category_id,
            product_type: req.product_type,
            seller_id: req.seller_id,
            search: req.search,
            limit: req.limit,
            offset: req.offset,
        })
        .await?;
    Ok(ApiResponse::ok(to_list(products)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// The caller's own products, including those still under review.
async fn mine(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<ProductResponse>>> {
    let products = state
        .product_service
        .list_own(&actor, req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(to_list(products)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/update", post(update))
        .route("/delete", post(delete))
        .route("/show", post(show))
        .route("/list", post(list))
        .route("/mine", post(mine))
}
