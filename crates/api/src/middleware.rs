//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use fanforge_core::{
    AdminService, AuthService, CascadeEngine, CategoryService, ImageStoreService, MediaCleaner,
    ModerationService, NotificationDispatcher, NotifierService, OrderService, ProductService,
    SellerService,
};
use fanforge_db::Store;
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub seller_service: SellerService,
    pub product_service: ProductService,
    pub order_service: OrderService,
    pub moderation_service: ModerationService,
    pub admin_service: AdminService,
    pub category_service: CategoryService,
}

impl AppState {
    /// Wire every service to one store and its two collaborators.
    #[must_use]
    pub fn new(store: Store, notifier: NotifierService, images: ImageStoreService) -> Self {
        let notifications = NotificationDispatcher::new(notifier);
        let cascade = CascadeEngine::new(store.clone(), MediaCleaner::new(images));
        let auth_service = AuthService::new(store.clone());

        Self {
            seller_service: SellerService::new(store.clone()),
            product_service: ProductService::new(store.clone(), cascade.clone()),
            order_service: OrderService::new(store.clone(), notifications.clone()),
            moderation_service: ModerationService::new(
                store.clone(),
                cascade.clone(),
                notifications,
            ),
            admin_service: AdminService::new(store.clone(), auth_service.clone(), cascade),
            category_service: CategoryService::new(store),
            auth_service,
        }
    }
}

/// Authentication middleware.
///
/// A valid bearer token puts the caller's [`Actor`](fanforge_core::Actor)
/// into the request extensions. Requests without one pass through anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.authenticate(token.trim()).await {
            Ok(actor) => {
                req.extensions_mut().insert(actor);
            }
            Err(e) => debug!(error = %e, "Ignoring invalid bearer token"),
        }
    }

    next.run(req).await
}
