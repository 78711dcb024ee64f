//! Seller application endpoints.

use axum::{Json, Router, extract::State, routing::post};
use fanforge_common::AppResult;
use fanforge_core::{ApplyInput, UpdateSellerInput};
use fanforge_db::entities::{SellerType, seller_profile};
use serde::Serialize;

use crate::{extractors::AuthActor, middleware::AppState, response::ApiResponse};

/// Seller profile response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerResponse {
    pub id: String,
    pub user_id: String,
    pub business_name: String,
    pub business_description: String,
    pub payment_methods: serde_json::Value,
    pub average_shipping_cost_cents: i64,
    pub estimated_delivery_days: i32,
    pub shipping_regions: String,
    pub social_links: Option<String>,
    pub is_approved: bool,
    pub seller_type: Option<SellerType>,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<seller_profile::Model> for SellerResponse {
    fn from(seller: seller_profile::Model) -> Self {
        Self {
            id: seller.id,
            user_id: seller.user_id,
            business_name: seller.business_name,
            business_description: seller.business_description,
            payment_methods: seller.payment_methods,
            average_shipping_cost_cents: seller.average_shipping_cost_cents,
            estimated_delivery_days: seller.estimated_delivery_days,
            shipping_regions: seller.shipping_regions,
            social_links: seller.social_links,
            is_approved: seller.is_approved,
            seller_type: seller.seller_type,
            is_deleted: seller.is_deleted,
            created_at: seller.created_at.to_rfc3339(),
            updated_at: seller.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Apply to become a seller.
async fn apply(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ApplyInput>,
) -> AppResult<ApiResponse<SellerResponse>> {
    let seller = state.seller_service.apply(&actor, req).await?;
    Ok(ApiResponse::ok(seller.into()))
}

/// The caller's own seller profile, approved or pending.
async fn show(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SellerResponse>> {
    let seller = state.seller_service.get_own(&actor).await?;
    Ok(ApiResponse::ok(seller.into()))
}

async fn update(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<UpdateSellerInput>,
) -> AppResult<ApiResponse<SellerResponse>> {
    let seller = state.seller_service.update_own(&actor, req).await?;
    Ok(ApiResponse::ok(seller.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apply", post(apply))
        .route("/show", post(show))
        .route("/update", post(update))
}
