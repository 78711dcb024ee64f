//! Fixtures shared by the service tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fanforge_common::AppResult;
use fanforge_db::entities::{
    OrderStatus, SellerType, UserRole, category, order, product, product_image, seller_profile,
    user,
};
use fanforge_db::{MemoryStore, Mutation, Store};

use crate::actor::Actor;
use crate::cascade::{CascadeEngine, now};
use crate::services::{
    AdminService, ApplyInput, AuthService, CategoryService, CreateProductInput, ImageInput,
    ImageStore, MediaCleaner, ModerationService, Notification, NotificationDispatcher, Notifier,
    OrderService, PlaceOrderInput, ProductService, RegisterInput, SellerService,
};

async fn wait_until<T: Clone>(log: &Mutex<Vec<T>>, count: usize) -> Vec<T> {
    for _ in 0..200 {
        if log.lock().unwrap().len() >= count {
            break;
        }
        tokio::task::yield_now().await;
    }
    log.lock().unwrap().clone()
}

/// Keeps every notification it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Wait until at least `count` notifications arrived, then return them.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        wait_until(&self.sent, count).await
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> AppResult<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Keeps every key it is asked to delete.
#[derive(Default)]
pub struct RecordingImageStore {
    deleted: Mutex<Vec<String>>,
}

impl RecordingImageStore {
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        wait_until(&self.deleted, count).await
    }
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn delete(&self, keys: &[String]) -> AppResult<()> {
        self.deleted.lock().unwrap().extend_from_slice(keys);
        Ok(())
    }
}

/// Every service wired to one in-memory store.
pub struct Fixture {
    pub memory: MemoryStore,
    pub store: Store,
    pub notifier: Arc<RecordingNotifier>,
    pub images: Arc<RecordingImageStore>,
    pub cascade: CascadeEngine,
    pub auth: AuthService,
    pub sellers: SellerService,
    pub products: ProductService,
    pub orders: OrderService,
    pub moderation: ModerationService,
    pub admin: AdminService,
    pub categories: CategoryService,
}

impl Fixture {
    pub async fn new() -> Self {
        let memory = MemoryStore::new();
        let store: Store = Arc::new(memory.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let images = Arc::new(RecordingImageStore::default());

        let notifications = NotificationDispatcher::new(notifier.clone());
        let cascade = CascadeEngine::new(store.clone(), MediaCleaner::new(images.clone()));
        let auth = AuthService::new(store.clone());

        Self {
            sellers: SellerService::new(store.clone()),
            products: ProductService::new(store.clone(), cascade.clone()),
            orders: OrderService::new(store.clone(), notifications.clone()),
            moderation: ModerationService::new(store.clone(), cascade.clone(), notifications),
            admin: AdminService::new(store.clone(), auth.clone(), cascade.clone()),
            categories: CategoryService::new(store.clone()),
            auth,
            cascade,
            memory,
            store,
            notifier,
            images,
        }
    }

    async fn seed(&self, mutation: Mutation) {
        self.memory.seed(vec![mutation]).await.unwrap();
    }

    pub async fn seed_user(&self, id: &str, role: UserRole) {
        self.seed(Mutation::InsertUser(user(id, role))).await;
    }

    pub async fn seed_seller(&self, id: &str, user_id: &str, approved: bool) {
        self.seed(Mutation::InsertSellerProfile(seller(id, user_id, approved)))
            .await;
    }

    pub async fn seed_category(&self, id: &str) {
        self.seed(Mutation::InsertCategory(category::Model {
            id: id.to_string(),
            name: format!("Category {id}"),
            description: None,
            created_at: now(),
        }))
        .await;
    }

    /// A product with one image keyed `products/{id}/0.jpg`.
    pub async fn seed_product(&self, id: &str, seller_id: &str, approved: bool) {
        self.seed(Mutation::InsertProduct {
            product: product::Model {
                id: id.to_string(),
                seller_id: seller_id.to_string(),
                category_id: "c1".to_string(),
                name: format!("Product {id}"),
                description: "A hand painted figure".to_string(),
                price_cents: 1999,
                product_type: Some(SellerType::FanMade),
                is_approved: approved,
                is_deleted: false,
                deleted_at: None,
                created_at: now(),
                updated_at: None,
            },
            images: vec![product_image::Model {
                id: format!("{id}-img0"),
                product_id: id.to_string(),
                url: format!("https://cdn.example.com/products/{id}/0.jpg"),
                public_id: format!("products/{id}/0.jpg"),
                position: 0,
            }],
        })
        .await;
    }

    pub async fn seed_order(
        &self,
        id: &str,
        buyer_id: &str,
        seller_id: &str,
        product_id: &str,
        status: OrderStatus,
    ) {
        self.seed(Mutation::InsertOrder(order::Model {
            id: id.to_string(),
            buyer_id: buyer_id.to_string(),
            seller_id: seller_id.to_string(),
            product_id: product_id.to_string(),
            buyer_address: "1 Main Street".to_string(),
            buyer_phone: "5551234567".to_string(),
            buyer_notes: None,
            status,
            is_cancelled: status == OrderStatus::Cancelled,
            cancellation_reason: None,
            created_at: now(),
            updated_at: None,
        }))
        .await;
    }
}

/// A user whose email is `{id}@example.com`.
pub fn user(id: &str, role: UserRole) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        password: "not-a-hash".to_string(),
        full_name: format!("User {id}"),
        phone_number: "5550000000".to_string(),
        address: "42 Test Road".to_string(),
        role,
        is_super_admin: false,
        token: None,
        is_deleted: false,
        deleted_at: None,
        created_at: now(),
        updated_at: None,
    }
}

/// Approved profiles are `FAN_MADE`.
pub fn seller(id: &str, user_id: &str, approved: bool) -> seller_profile::Model {
    seller_profile::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        business_name: format!("Shop {id}"),
        business_description: "Hand made fan goods".to_string(),
        payment_methods: serde_json::json!(["UPI", "PayPal"]),
        average_shipping_cost_cents: 500,
        estimated_delivery_days: 7,
        shipping_regions: "Worldwide".to_string(),
        social_links: None,
        is_approved: approved,
        seller_type: approved.then_some(SellerType::FanMade),
        is_deleted: false,
        deleted_at: None,
        created_at: now(),
        updated_at: None,
    }
}

pub fn actor(user_id: &str, role: UserRole) -> Actor {
    Actor {
        user_id: user_id.to_string(),
        role,
        is_super_admin: false,
    }
}

pub fn admin_actor() -> Actor {
    actor("admin", UserRole::Admin)
}

/// Password is `secret123`.
pub fn register_input(email: &str) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        password: "secret123".to_string(),
        full_name: "Ann Example".to_string(),
        phone_number: "5551234567".to_string(),
        address: "1 Main Street".to_string(),
    }
}

pub fn apply_input() -> ApplyInput {
    ApplyInput {
        business_name: "Fan Shop".to_string(),
        business_description: "Hand made figures and prints".to_string(),
        payment_methods: vec!["UPI".to_string()],
        average_shipping_cost_cents: 499,
        estimated_delivery_days: 5,
        shipping_regions: "Worldwide".to_string(),
        social_links: None,
    }
}

pub fn create_product_input(category_id: &str) -> CreateProductInput {
    CreateProductInput {
        name: "Dragon figure".to_string(),
        description: "A hand painted dragon figure".to_string(),
        price_cents: 2999,
        category_id: category_id.to_string(),
        images: vec![ImageInput {
            url: "https://cdn.example.com/dragon.jpg".to_string(),
            public_id: "products/dragon.jpg".to_string(),
        }],
    }
}

pub fn place_input(product_id: &str) -> PlaceOrderInput {
    PlaceOrderInput {
        product_id: product_id.to_string(),
        buyer_address: "1 Main Street".to_string(),
        buyer_phone: "5551234567".to_string(),
        buyer_notes: None,
    }
}
