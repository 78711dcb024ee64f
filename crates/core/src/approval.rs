//! Approval gate.
//!
//! Pure predicates over already-loaded rows. Callers that act on the answer
//! must evaluate them on rows read inside the transaction that performs the
//! write.

use fanforge_db::entities::{product, seller_profile};

use crate::actor::Actor;

/// Whether the seller may list and sell anything at all.
#[must_use]
pub const fn seller_can_transact(seller: &seller_profile::Model) -> bool {
    seller.is_approved && !seller.is_deleted
}

/// Whether the product may be ordered.
#[must_use]
pub const fn can_transact(seller: &seller_profile::Model, product: &product::Model) -> bool {
    seller_can_transact(seller) && product.is_approved && !product.is_deleted
}

/// Whether `viewer` may see the product.
///
/// Deleted products are hidden from everyone. Products that fail the gate
/// stay visible to their owner and to admins.
#[must_use]
pub fn can_view_product(
    seller: &seller_profile::Model,
    product: &product::Model,
    viewer: Option<&Actor>,
) -> bool {
    if product.is_deleted {
        return false;
    }
    if can_transact(seller, product) {
        return true;
    }
    viewer.is_some_and(|v| v.is_admin() || v.user_id == seller.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fanforge_db::entities::{SellerType, UserRole};

    fn seller(is_approved: bool, is_deleted: bool) -> seller_profile::Model {
        seller_profile::Model {
            id: "sp1".to_string(),
            user_id: "owner".to_string(),
            business_name: "Shop".to_string(),
            business_description: "Hand made figures".to_string(),
            payment_methods: serde_json::json!(["UPI"]),
            average_shipping_cost_cents: 500,
            estimated_delivery_days: 5,
            shipping_regions: "Everywhere".to_string(),
            social_links: None,
            is_approved,
            seller_type: is_approved.then_some(SellerType::FanMade),
            is_deleted,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn product(is_approved: bool, is_deleted: bool) -> product::Model {
        product::Model {
            id: "p1".to_string(),
            seller_id: "sp1".to_string(),
            category_id: "c1".to_string(),
            name: "Figure".to_string(),
            description: "A small figure".to_string(),
            price_cents: 1999,
            product_type: Some(SellerType::FanMade),
            is_approved,
            is_deleted,
            deleted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn viewer(user_id: &str, role: UserRole) -> Actor {
        Actor {
            user_id: user_id.to_string(),
            role,
            is_super_admin: false,
        }
    }

    #[test]
    fn test_gate_requires_all_four_flags() {
        assert!(can_transact(&seller(true, false), &product(true, false)));
        assert!(!can_transact(&seller(false, false), &product(true, false)));
        assert!(!can_transact(&seller(true, true), &product(true, false)));
        assert!(!can_transact(&seller(true, false), &product(false, false)));
        assert!(!can_transact(&seller(true, false), &product(true, true)));
    }

    #[test]
    fn test_unapproved_product_visible_to_owner_and_admin_only() {
        let s = seller(true, false);
        let p = product(false, false);

        assert!(!can_view_product(&s, &p, None));
        assert!(!can_view_product(&s, &p, Some(&viewer("other", UserRole::Buyer))));
        assert!(can_view_product(&s, &p, Some(&viewer("owner", UserRole::Seller))));
        assert!(can_view_product(&s, &p, Some(&viewer("admin", UserRole::Admin))));
    }

    #[test]
    fn test_deleted_product_hidden_from_admin() {
        let s = seller(true, false);
        let p = product(true, true);
        assert!(!can_view_product(&s, &p, Some(&viewer("admin", UserRole::Admin))));
    }
}
