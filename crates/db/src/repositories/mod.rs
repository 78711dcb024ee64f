//! Read repositories.
//!
//! Writes never go through these; they are expressed as a
//! [`MutationSet`](crate::mutation::MutationSet) and applied by a store
//! transaction.

mod category;
mod order;
mod product;
mod seller_profile;
mod user;

pub use category::CategoryRepository;
pub use order::{OrderFilter, OrderRepository};
pub use product::{ProductFilter, ProductRepository, ProductVisibility};
pub use seller_profile::SellerProfileRepository;
pub use user::{UserFilter, UserRepository};
