//! Order state machine.
//!
//! ```text
//! PENDING -> ACCEPTED -> PROCESSING -> SHIPPED -> DELIVERED
//!    |
//!    +-> CANCELLED   (buyer, while pending; cascades from any open status)
//! ```
//!
//! Sellers move an order exactly one step forward. The planners here only
//! validate and describe the write; the order service applies it.

use fanforge_common::{AppError, AppResult};
use fanforge_db::entities::{CancellationReason, OrderStatus, order};
use fanforge_db::{Mutation, MutationSet};
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::services::notification::NotificationKind;

/// The only status a seller may move `status` to.
#[must_use]
pub const fn successor(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::Pending => Some(OrderStatus::Accepted),
        OrderStatus::Accepted => Some(OrderStatus::Processing),
        OrderStatus::Processing => Some(OrderStatus::Shipped),
        OrderStatus::Shipped => Some(OrderStatus::Delivered),
        OrderStatus::Delivered | OrderStatus::Cancelled => None,
    }
}

/// Plan a seller-initiated status change.
///
/// Checks run in a fixed order: ownership, then the cancellation tombstone,
/// then the transition table.
pub fn plan_advance(
    order: &order::Model,
    requested: OrderStatus,
    acting_seller_id: &str,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if order.seller_id != acting_seller_id {
        return Err(AppError::Forbidden(
            "You can only update your own orders".to_string(),
        ));
    }
    if order.is_cancelled {
        return Err(AppError::InvalidState(
            "Cannot update cancelled orders".to_string(),
        ));
    }
    if successor(order.status) != Some(requested) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot change status from {} to {}",
            order.status, requested
        )));
    }

    Ok(MutationSet::new("advance_order", at).with(Mutation::AdvanceOrder {
        order_id: order.id.clone(),
        from: order.status,
        to: requested,
    }))
}

/// Plan a buyer's own cancellation.
pub fn plan_cancel(
    order: &order::Model,
    requesting_buyer_id: &str,
    at: DateTimeWithTimeZone,
) -> AppResult<MutationSet> {
    if order.buyer_id != requesting_buyer_id {
        return Err(AppError::Forbidden(
            "You can only cancel your own orders".to_string(),
        ));
    }
    if order.is_cancelled || order.status != OrderStatus::Pending {
        return Err(AppError::InvalidState(
            "Only pending orders can be cancelled".to_string(),
        ));
    }

    Ok(MutationSet::new("cancel_order", at).with(Mutation::CancelPendingOrder {
        order_id: order.id.clone(),
        reason: CancellationReason::BuyerRequest,
    }))
}

/// Notification sent to the buyer after a successful advance.
///
/// Acceptance is reported separately because it is the moment the seller's
/// contact details become visible.
#[must_use]
pub const fn advance_notification(to: OrderStatus) -> NotificationKind {
    match to {
        OrderStatus::Accepted => NotificationKind::OrderAccepted,
        _ => NotificationKind::OrderStatusChanged,
    }
}
