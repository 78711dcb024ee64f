//! Category endpoints.

use axum::{Json, Router, extract::State, routing::post};
use fanforge_common::AppResult;
use fanforge_core::CategoryCount;
use fanforge_db::entities::category;
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

/// Category response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<category::Model> for CategoryResponse {
    fn from(category: category::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            created_at: category.created_at.to_rfc3339(),
        }
    }
}

/// Category with its product count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountResponse {
    #[serde(flatten)]
    pub category: CategoryResponse,
    pub product_count: u64,
}

impl From<CategoryCount> for CategoryCountResponse {
    fn from(row: CategoryCount) -> Self {
        Self {
            category: row.category.into(),
            product_count: row.product_count,
        }
    }
}

async fn list(
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CategoryCountResponse>>> {
    let categories = state.category_service.list_with_counts().await?;
    Ok(ApiResponse::ok(
        categories.into_iter().map(Into::into).collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowCategoryRequest {
    pub category_id: String,
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<ShowCategoryRequest>,
) -> AppResult<ApiResponse<CategoryResponse>> {
    let category = state.category_service.get(&req.category_id).await?;
    Ok(ApiResponse::ok(category.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/show", post(show))
}
