//! HTTP API layer for fanforge-rs.
//!
//! This crate exposes the marketplace over JSON:
//!
//! - **Endpoints**: accounts, seller applications, products, orders, administration
//! - **Extractors**: the authenticated [`Actor`](fanforge_core::Actor)
//! - **Middleware**: bearer-token authentication
//!
//! Every endpoint is a `POST` taking and returning JSON, mounted under `/api`.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
