//! Declarative write model.
//!
//! Every state change is described as a [`MutationSet`] and handed to
//! [`StoreTransaction::apply`](crate::store::StoreTransaction::apply), which
//! executes all of it inside one transaction. Single-row updates carry their
//! precondition into the `WHERE` clause; a guarded write that matches no row
//! aborts the set with [`Mutation::guard_failure`].

use crate::entities::{
    CancellationReason, OrderStatus, SellerType, UserRole, category, order, product,
    product_image, seller_profile, user,
};
use fanforge_common::AppError;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Partial update of a seller profile's business details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerDetailsChanges {
    pub business_name: Option<String>,
    pub business_description: Option<String>,
    pub payment_methods: Option<Vec<String>>,
    pub average_shipping_cost_cents: Option<i64>,
    pub estimated_delivery_days: Option<i32>,
    pub shipping_regions: Option<String>,
    pub social_links: Option<String>,
}

impl SellerDetailsChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.business_name.is_none()
            && self.business_description.is_none()
            && self.payment_methods.is_none()
            && self.average_shipping_cost_cents.is_none()
            && self.estimated_delivery_days.is_none()
            && self.shipping_regions.is_none()
            && self.social_links.is_none()
    }
}

/// Partial update of a product's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category_id: Option<String>,
}

impl ProductChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.category_id.is_none()
    }
}

/// Partial update of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// A single entity write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    InsertUser(user::Model),
    SetUserToken {
        user_id: String,
        token: Option<String>,
    },
    SetUserRole {
        user_id: String,
        role: UserRole,
    },
    /// Guarded: user not deleted and not a super admin.
    SoftDeleteUser {
        user_id: String,
    },

    InsertSellerProfile(seller_profile::Model),
    UpdateSellerDetails {
        seller_id: String,
        changes: SellerDetailsChanges,
    },
    /// Guarded: profile neither approved nor deleted.
    ApproveSellerProfile {
        seller_id: String,
        seller_type: SellerType,
    },
    SetSellerType {
        seller_id: String,
        seller_type: SellerType,
    },
    SoftDeleteSellerProfile {
        seller_id: String,
    },

    InsertCategory(category::Model),
    /// Guarded: category exists. Names stay unique.
    UpdateCategory {
        category_id: String,
        changes: CategoryChanges,
    },

    InsertProduct {
        product: product::Model,
        images: Vec<product_image::Model>,
    },
    /// Always clears `is_approved`.
    UpdateProductContent {
        product_id: String,
        changes: ProductChanges,
    },
    /// Guarded: product neither approved nor deleted.
    ApproveProduct {
        product_id: String,
    },
    SoftDeleteProduct {
        product_id: String,
    },
    SoftDeleteProductsOfSeller {
        seller_id: String,
    },
    /// Rewrites every product of the seller, deleted or not.
    SetProductTypeForSeller {
        seller_id: String,
        product_type: SellerType,
    },

    InsertOrder(order::Model),
    /// Guarded: order still in `from` and not cancelled.
    AdvanceOrder {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },
    /// Guarded: order still pending and not cancelled.
    CancelPendingOrder {
        order_id: String,
        reason: CancellationReason,
    },
    CancelOpenOrdersAsSeller {
        seller_id: String,
        reason: CancellationReason,
    },
    CancelOpenOrdersAsBuyer {
        buyer_id: String,
        reason: CancellationReason,
    },
}

impl Mutation {
    /// Stable name used in logs and fault injection.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InsertUser(_) => "insert_user",
            Self::SetUserToken { .. } => "set_user_token",
            Self::SetUserRole { .. } => "set_user_role",
            Self::SoftDeleteUser { .. } => "soft_delete_user",
            Self::InsertSellerProfile(_) => "insert_seller_profile",
            Self::UpdateSellerDetails { .. } => "update_seller_details",
            Self::ApproveSellerProfile { .. } => "approve_seller_profile",
            Self::SetSellerType { .. } => "set_seller_type",
            Self::SoftDeleteSellerProfile { .. } => "soft_delete_seller_profile",
            Self::InsertCategory(_) => "insert_category",
            Self::UpdateCategory { .. } => "update_category",
            Self::InsertProduct { .. } => "insert_product",
            Self::UpdateProductContent { .. } => "update_product_content",
            Self::ApproveProduct { .. } => "approve_product",
            Self::SoftDeleteProduct { .. } => "soft_delete_product",
            Self::SoftDeleteProductsOfSeller { .. } => "soft_delete_products_of_seller",
            Self::SetProductTypeForSeller { .. } => "set_product_type_for_seller",
            Self::InsertOrder(_) => "insert_order",
            Self::AdvanceOrder { .. } => "advance_order",
            Self::CancelPendingOrder { .. } => "cancel_pending_order",
            Self::CancelOpenOrdersAsSeller { .. } => "cancel_open_orders_as_seller",
            Self::CancelOpenOrdersAsBuyer { .. } => "cancel_open_orders_as_buyer",
        }
    }

    /// Whether the write targets exactly one existing row and must affect it.
    #[must_use]
    pub const fn is_guarded(&self) -> bool {
        matches!(
            self,
            Self::SetUserToken { .. }
                | Self::SetUserRole { .. }
                | Self::SoftDeleteUser { .. }
                | Self::UpdateSellerDetails { .. }
                | Self::ApproveSellerProfile { .. }
                | Self::SetSellerType { .. }
                | Self::SoftDeleteSellerProfile { .. }
                | Self::UpdateCategory { .. }
                | Self::UpdateProductContent { .. }
                | Self::ApproveProduct { .. }
                | Self::SoftDeleteProduct { .. }
                | Self::AdvanceOrder { .. }
                | Self::CancelPendingOrder { .. }
        )
    }

    /// Error reported when a guarded write matched no row.
    #[must_use]
    pub fn guard_failure(&self) -> AppError {
        match self {
            Self::SetUserToken { user_id, .. }
            | Self::SetUserRole { user_id, .. }
            | Self::SoftDeleteUser { user_id } => AppError::NotFound(format!("User {user_id}")),
            Self::ApproveSellerProfile { seller_id, .. } => {
                AppError::AlreadyApproved(format!("Seller profile {seller_id}"))
            }
            Self::UpdateSellerDetails { seller_id, .. }
            | Self::SetSellerType { seller_id, .. }
            | Self::SoftDeleteSellerProfile { seller_id } => {
                AppError::NotFound(format!("Seller profile {seller_id}"))
            }
            Self::UpdateCategory { category_id, .. } => {
                AppError::NotFound(format!("Category {category_id}"))
            }
            Self::ApproveProduct { product_id } => {
                AppError::AlreadyApproved(format!("Product {product_id}"))
            }
            Self::UpdateProductContent { product_id, .. } | Self::SoftDeleteProduct { product_id } => {
                AppError::NotFound(format!("Product {product_id}"))
            }
            Self::AdvanceOrder { order_id, from, .. } => AppError::InvalidState(format!(
                "Order {order_id} is no longer {from}; it was modified concurrently"
            )),
            Self::CancelPendingOrder { .. } => {
                AppError::InvalidState("Only pending orders can be cancelled".to_string())
            }
            other => AppError::Internal(format!("{} matched no rows", other.name())),
        }
    }
}

/// An ordered list of mutations applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationSet {
    /// What triggered the set, e.g. `ban_user`.
    pub label: &'static str,
    /// Timestamp written to every `deleted_at`/`updated_at` in the set.
    pub at: DateTimeWithTimeZone,
    pub mutations: Vec<Mutation>,
}

impl MutationSet {
    #[must_use]
    pub const fn new(label: &'static str, at: DateTimeWithTimeZone) -> Self {
        Self {
            label,
            at,
            mutations: Vec::new(),
        }
    }

    /// Append a mutation.
    #[must_use]
    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Mutation names in application order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.mutations.iter().map(Mutation::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_names_follow_push_order() {
        let set = MutationSet::new("remove_seller", Utc::now().into())
            .with(Mutation::SoftDeleteSellerProfile {
                seller_id: "sp1".to_string(),
            })
            .with(Mutation::SoftDeleteProductsOfSeller {
                seller_id: "sp1".to_string(),
            });

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.names(),
            vec!["soft_delete_seller_profile", "soft_delete_products_of_seller"]
        );
    }

    #[test]
    fn test_guard_failures_use_domain_errors() {
        let approve = Mutation::ApproveSellerProfile {
            seller_id: "sp1".to_string(),
            seller_type: SellerType::Official,
        };
        assert!(approve.is_guarded());
        assert!(matches!(approve.guard_failure(), AppError::AlreadyApproved(_)));

        let cancel = Mutation::CancelPendingOrder {
            order_id: "o1".to_string(),
            reason: CancellationReason::BuyerRequest,
        };
        assert!(matches!(cancel.guard_failure(), AppError::InvalidState(_)));

        let bulk = Mutation::CancelOpenOrdersAsBuyer {
            buyer_id: "u1".to_string(),
            reason: CancellationReason::UserBanned,
        };
        assert!(!bulk.is_guarded());
    }

    #[test]
    fn test_changes_emptiness() {
        assert!(ProductChanges::default().is_empty());
        assert!(
            !ProductChanges {
                price_cents: Some(100),
                ..Default::default()
            }
            .is_empty()
        );
        assert!(SellerDetailsChanges::default().is_empty());
    }
}
