//! Core business logic for fanforge-rs.
//!
//! - [`approval`]: which sellers and products may transact
//! - [`order_state`]: the order status machine
//! - [`cascade`]: multi-entity admin actions, planned then applied atomically
//! - [`services`]: the operations the API exposes, taking an explicit [`Actor`]

#![allow(missing_docs)]

pub mod actor;
pub mod approval;
pub mod cascade;
pub mod order_state;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use actor::Actor;
pub use cascade::CascadeEngine;
pub use services::*;
