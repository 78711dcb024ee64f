//! Database entities.

pub mod category;
pub mod order;
pub mod product;
pub mod product_image;
pub mod seller_profile;
pub mod user;

pub use category::Entity as Category;
pub use order::Entity as Order;
pub use product::Entity as Product;
pub use product_image::Entity as ProductImage;
pub use seller_profile::Entity as SellerProfile;
pub use user::Entity as User;

pub use order::{CancellationReason, OrderStatus};
pub use seller_profile::SellerType;
pub use user::UserRole;
