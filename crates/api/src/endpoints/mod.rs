//! API endpoints.

mod admin;
mod auth;
mod categories;
mod orders;
mod products;
mod sellers;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/sellers", sellers::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/categories", categories::router())
        .nest("/admin", admin::router())
}
