//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod auth;
pub mod category;
pub mod email;
pub mod media;
pub mod moderation;
pub mod notification;
pub mod order;
pub mod product;
pub mod seller;

pub use admin::{AdminService, UserDetail, UserPage};
pub use auth::{AuthService, Me, RegisterInput, Session, SigninInput};
pub use category::{CategoryCount, CategoryService, CreateCategoryInput, UpdateCategoryInput};
pub use email::EmailNotifier;
pub use media::{ImageStore, ImageStoreService, LocalImageStore, MediaCleaner, NoOpImageStore};
pub use moderation::ModerationService;
pub use notification::{
    LogNotifier, NoOpNotifier, Notification, NotificationDispatcher, NotificationKind, Notifier,
    NotifierService,
};
pub use order::{BuyerOrder, OrderService, PlaceOrderInput, SellerContact, SellerOrder};
pub use product::{
    CreateProductInput, ImageInput, ProductDetail, ProductQuery, ProductService,
    UpdateProductInput,
};
pub use seller::{ApplyInput, PAYMENT_METHODS, SellerService, UpdateSellerInput};
