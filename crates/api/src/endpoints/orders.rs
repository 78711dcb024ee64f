//! Order endpoints.

use axum::{Json, Router, extract::State, routing::post};
use fanforge_common::AppResult;
use fanforge_core::{BuyerOrder, PlaceOrderInput, SellerContact, SellerOrder};
use fanforge_db::entities::{CancellationReason, OrderStatus, order};
use serde::{Deserialize, Serialize};

use super::{auth::UserResponse, products::ProductResponse, sellers::SellerResponse};
use crate::{extractors::AuthActor, middleware::AppState, response::ApiResponse};

/// Order response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub product_id: String,
    pub buyer_address: String,
    pub buyer_phone: String,
    pub buyer_notes: Option<String>,
    pub status: OrderStatus,
    pub is_cancelled: bool,
    pub cancellation_reason: Option<CancellationReason>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<order::Model> for OrderResponse {
    fn from(order: order::Model) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            product_id: order.product_id,
            buyer_address: order.buyer_address,
            buyer_phone: order.buyer_phone,
            buyer_notes: order.buyer_notes,
            status: order.status,
            is_cancelled: order.is_cancelled,
            cancellation_reason: order.cancellation_reason,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerContactResponse {
    pub email: String,
    pub phone_number: String,
}

impl From<SellerContact> for SellerContactResponse {
    fn from(contact: SellerContact) -> Self {
        Self {
            email: contact.email,
            phone_number: contact.phone_number,
        }
    }
}

/// An order as its buyer sees it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerOrderResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub product: Option<ProductResponse>,
    pub seller: Option<SellerResponse>,
    /// Absent while the order is pending.
    pub seller_contact: Option<SellerContactResponse>,
}

impl From<BuyerOrder> for BuyerOrderResponse {
    fn from(view: BuyerOrder) -> Self {
        Self {
            order: view.order.into(),
            product: view.product.map(Into::into),
            seller: view.seller.map(Into::into),
            seller_contact: view.seller_contact.map(Into::into),
        }
    }
}

/// An order as its seller sees it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerOrderResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub product: Option<ProductResponse>,
    pub buyer: Option<UserResponse>,
}

impl From<SellerOrder> for SellerOrderResponse {
    fn from(view: SellerOrder) -> Self {
        Self {
            order: view.order.into(),
            product: view.product.map(Into::into),
            buyer: view.buyer.map(Into::into),
        }
    }
}

/// Place an order for an approved product.
async fn create(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<PlaceOrderInput>,
) -> AppResult<ApiResponse<OrderResponse>> {
    let order = state.order_service.place(&actor, req).await?;
    Ok(ApiResponse::ok(order.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub order_id: String,
}

/// Buyer cancels a pending order.
async fn cancel(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<CancelOrderRequest>,
) -> AppResult<ApiResponse<OrderResponse>> {
    let order = state.order_service.cancel(&actor, &req.order_id).await?;
    Ok(ApiResponse::ok(order.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_id: String,
    pub status: OrderStatus,
}

/// Seller moves an order one step forward.
async fn update_status(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<ApiResponse<OrderResponse>> {
    let order = state
        .order_service
        .advance(&actor, &req.order_id, req.status)
        .await?;
    Ok(ApiResponse::ok(order.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersRequest {
    pub status: Option<OrderStatus>,
}

/// Orders the caller placed.
async fn mine(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ListOrdersRequest>,
) -> AppResult<ApiResponse<Vec<BuyerOrderResponse>>> {
    let orders = state.order_service.list_for_buyer(&actor, req.status).await?;
    Ok(ApiResponse::ok(orders.into_iter().map(Into::into).collect()))
}

/// Orders placed with the caller's shop.
async fn received(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ListOrdersRequest>,
) -> AppResult<ApiResponse<Vec<SellerOrderResponse>>> {
    let orders = state
        .order_service
        .list_for_seller(&actor, req.status)
        .await?;
    Ok(ApiResponse::ok(orders.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/cancel", post(cancel))
        .route("/update-status", post(update_status))
        .route("/mine", post(mine))
        .route("/received", post(received))
}
