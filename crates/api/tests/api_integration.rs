//! API integration tests.
//!
//! These drive the whole router, auth middleware included, over an
//! in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware,
};
use fanforge_api::{AppState, auth_middleware, router as api_router};
use fanforge_core::{NoOpImageStore, NoOpNotifier};
use fanforge_db::entities::{UserRole, category, user};
use fanforge_db::{MemoryStore, Mutation};
use serde_json::{Value, json};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";

fn staff(id: &str, role: UserRole, token: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        password: "unused".to_string(),
        full_name: format!("Staff {id}"),
        phone_number: "5550000000".to_string(),
        address: "1 Admin Way".to_string(),
        role,
        is_super_admin: false,
        token: Some(token.to_string()),
        is_deleted: false,
        deleted_at: None,
        created_at: chrono::Utc::now().into(),
        updated_at: None,
    }
}

/// Create the app over a store holding one admin and one category.
async fn create_app() -> Router {
    let memory = MemoryStore::new();
    memory
        .seed(vec![
            Mutation::InsertUser(staff("admin", UserRole::Admin, ADMIN_TOKEN)),
            Mutation::InsertCategory(category::Model {
                id: "c1".to_string(),
                name: "Figures".to_string(),
                description: None,
                created_at: chrono::Utc::now().into(),
            }),
        ])
        .await
        .unwrap();

    let state = AppState::new(
        Arc::new(memory),
        Arc::new(NoOpNotifier),
        Arc::new(NoOpImageStore),
    );

    Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

async fn call(app: &Router, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register and sign in; returns the token.
async fn sign_up(app: &Router, email: &str) -> String {
    let (status, _) = call(
        app,
        "/api/auth/register",
        None,
        json!({
            "email": email,
            "password": "secret123",
            "fullName": "Ann Example",
            "phoneNumber": "5551234567",
            "address": "1 Main Street",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        app,
        "/api/auth/signin",
        None,
        json!({ "email": email, "password": "secret123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

/// A signed-in, approved seller with one approved product.
async fn open_shop(app: &Router, email: &str) -> (String, String) {
    let token = sign_up(app, email).await;

    let (status, body) = call(
        app,
        "/api/sellers/apply",
        Some(&token),
        json!({
            "businessName": "Fan Shop",
            "businessDescription": "Hand made figures and prints",
            "paymentMethods": ["UPI"],
            "averageShippingCostCents": 499,
            "estimatedDeliveryDays": 5,
            "shippingRegions": "Worldwide",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let seller_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        app,
        "/api/admin/sellers/approve",
        Some(ADMIN_TOKEN),
        json!({ "sellerId": seller_id, "sellerType": "FAN_MADE" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"]["role"], "SELLER");

    let (status, body) = call(
        app,
        "/api/products/create",
        Some(&token),
        json!({
            "name": "Dragon figure",
            "description": "A hand painted dragon figure",
            "priceCents": 2999,
            "categoryId": "c1",
            "images": [{ "url": "https://cdn.example.com/d.jpg", "publicId": "products/d.jpg" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["productType"], "FAN_MADE");
    assert_eq!(body["data"]["isApproved"], false);
    let product_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        app,
        "/api/admin/products/approve",
        Some(ADMIN_TOKEN),
        json!({ "productId": product_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (token, product_id)
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_app().await;
    let (status, _) = call(&app, "/api/nonexistent", None, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_responses_hide_credentials() {
    let app = create_app().await;
    let token = sign_up(&app, "ann@example.com").await;

    let (status, body) = call(&app, "/api/auth/me", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let user = &body["data"]["user"];
    assert_eq!(user["email"], "ann@example.com");
    assert_eq!(user["fullName"], "Ann Example");
    assert_eq!(user["role"], "BUYER");
    assert!(user.get("password").is_none());
    assert!(user.get("token").is_none());
    assert!(body["data"]["seller"].is_null());
}

#[tokio::test]
async fn test_signin_with_wrong_password_is_unauthorized() {
    let app = create_app().await;
    sign_up(&app, "ann@example.com").await;

    let (status, body) = call(
        &app,
        "/api/auth/signin",
        None,
        json!({ "email": "ann@example.com", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = create_app().await;
    let (status, body) = call(
        &app,
        "/api/auth/register",
        None,
        json!({
            "email": "not-an-email",
            "password": "secret123",
            "fullName": "Ann Example",
            "phoneNumber": "5551234567",
            "address": "1 Main Street",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = create_app().await;
    sign_up(&app, "ann@example.com").await;

    let (status, body) = call(
        &app,
        "/api/auth/register",
        None,
        json!({
            "email": "ANN@example.com",
            "password": "secret123",
            "fullName": "Ann Again",
            "phoneNumber": "5551234567",
            "address": "1 Main Street",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_protected_endpoint_requires_token() {
    let app = create_app().await;

    let (status, _) = call(&app, "/api/orders/mine", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "/api/orders/mine", Some("bogus"), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signout_invalidates_token() {
    let app = create_app().await;
    let token = sign_up(&app, "ann@example.com").await;

    let (status, _) = call(&app, "/api/auth/signout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "/api/auth/me", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_endpoints_reject_buyers() {
    let app = create_app().await;
    let token = sign_up(&app, "ann@example.com").await;

    let (status, body) = call(&app, "/api/admin/users/list", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_unapproved_product_is_hidden_from_public() {
    let app = create_app().await;
    let (seller_token, product_id) = open_shop(&app, "shop@example.com").await;

    // Any edit sends the product back for review.
    let (status, body) = call(
        &app,
        "/api/products/update",
        Some(&seller_token),
        json!({ "productId": product_id, "priceCents": 3499 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isApproved"], false);

    let (_, body) = call(&app, "/api/products/list", None, json!({})).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = call(
        &app,
        "/api/products/show",
        None,
        json!({ "productId": product_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "/api/products/show",
        Some(&seller_token),
        json!({ "productId": product_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["images"][0]["publicId"], "products/d.jpg");
}

#[tokio::test]
async fn test_order_lifecycle() {
    let app = create_app().await;
    let (seller_token, product_id) = open_shop(&app, "shop@example.com").await;
    let buyer_token = sign_up(&app, "buyer@example.com").await;

    let (_, body) = call(&app, "/api/products/list", None, json!({})).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        "/api/orders/create",
        Some(&buyer_token),
        json!({
            "productId": product_id,
            "buyerAddress": "9 Buyer Lane",
            "buyerPhone": "5559876543",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PENDING");
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    // Contact details stay hidden while the order is pending.
    let (_, body) = call(&app, "/api/orders/mine", Some(&buyer_token), json!({})).await;
    assert!(body["data"][0]["sellerContact"].is_null());

    let (status, body) = call(
        &app,
        "/api/orders/update-status",
        Some(&seller_token),
        json!({ "orderId": order_id, "status": "DELIVERED" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (status, body) = call(
        &app,
        "/api/orders/update-status",
        Some(&seller_token),
        json!({ "orderId": order_id, "status": "ACCEPTED" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ACCEPTED");

    let (_, body) = call(&app, "/api/orders/mine", Some(&buyer_token), json!({})).await;
    assert_eq!(
        body["data"][0]["sellerContact"]["email"],
        "shop@example.com"
    );

    // Past PENDING the buyer can no longer cancel.
    let (status, body) = call(
        &app,
        "/api/orders/cancel",
        Some(&buyer_token),
        json!({ "orderId": order_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (_, body) = call(
        &app,
        "/api/orders/received",
        Some(&seller_token),
        json!({ "status": "ACCEPTED" }),
    )
    .await;
    assert_eq!(body["data"][0]["buyer"]["email"], "buyer@example.com");
}

#[tokio::test]
async fn test_seller_cannot_buy_own_product() {
    let app = create_app().await;
    let (seller_token, product_id) = open_shop(&app, "shop@example.com").await;

    let (status, _) = call(
        &app,
        "/api/orders/create",
        Some(&seller_token),
        json!({
            "productId": product_id,
            "buyerAddress": "1 Main Street",
            "buyerPhone": "5551234567",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approving_twice_conflicts() {
    let app = create_app().await;
    let (_, product_id) = open_shop(&app, "shop@example.com").await;

    let (status, body) = call(
        &app,
        "/api/admin/products/approve",
        Some(ADMIN_TOKEN),
        json!({ "productId": product_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_APPROVED");
}

#[tokio::test]
async fn test_banning_a_seller_takes_down_the_shop() {
    let app = create_app().await;
    let (seller_token, product_id) = open_shop(&app, "shop@example.com").await;
    let buyer_token = sign_up(&app, "buyer@example.com").await;

    let (_, body) = call(
        &app,
        "/api/orders/create",
        Some(&buyer_token),
        json!({
            "productId": product_id,
            "buyerAddress": "9 Buyer Lane",
            "buyerPhone": "5559876543",
        }),
    )
    .await;
    assert_eq!(body["data"]["status"], "PENDING");

    let (_, me) = call(&app, "/api/auth/me", Some(&seller_token), json!({})).await;
    let seller_user_id = me["data"]["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "/api/admin/users/ban",
        Some(ADMIN_TOKEN),
        json!({ "userId": seller_user_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDeleted"], true);

    let (status, _) = call(&app, "/api/auth/me", Some(&seller_token), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = call(&app, "/api/products/list", None, json!({})).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (_, body) = call(&app, "/api/orders/mine", Some(&buyer_token), json!({})).await;
    assert_eq!(body["data"][0]["status"], "CANCELLED");
    assert_eq!(body["data"][0]["isCancelled"], true);
    assert_eq!(body["data"][0]["cancellationReason"], "USER_BANNED");
}

#[tokio::test]
async fn test_admin_category_update_and_counts() {
    let app = create_app().await;
    let (seller_token, product_id) = open_shop(&app, "shop@example.com").await;

    let (status, body) = call(
        &app,
        "/api/admin/categories/update",
        Some(ADMIN_TOKEN),
        json!({ "categoryId": "c1", "name": "Statues", "description": "Resin and PVC" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Statues");
    assert_eq!(body["data"]["description"], "Resin and PVC");

    let (status, _) = call(
        &app,
        "/api/admin/categories/update",
        Some(&seller_token),
        json!({ "categoryId": "c1", "name": "Mine" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An edit unlists the product until it is approved again.
    let (status, _) = call(
        &app,
        "/api/products/update",
        Some(&seller_token),
        json!({ "productId": product_id, "priceCents": 3499 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "/api/categories/list", None, json!({})).await;
    assert_eq!(body["data"][0]["name"], "Statues");
    assert_eq!(body["data"][0]["productCount"], 0);

    let (status, body) = call(&app, "/api/admin/categories/list", Some(ADMIN_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["productCount"], 1);
}
