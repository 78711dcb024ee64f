//! Notification hook.
//!
//! Notifications are sent after the transaction that caused them has
//! committed. Delivery runs on its own task; a failed delivery is logged and
//! never reaches the caller.

use std::sync::Arc;

use async_trait::async_trait;
use fanforge_common::AppResult;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Events that produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    /// To the buyer, after placing an order.
    OrderPlaced,
    /// To the seller, after a buyer placed an order.
    NewOrder,
    /// To the buyer; seller contact details are now visible.
    OrderAccepted,
    /// To the buyer, for every later status change.
    OrderStatusChanged,
    /// To the buyer, after cancelling.
    OrderCancelled,
    ProductApproved,
    SellerApproved,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderPlaced => "order_placed",
            Self::NewOrder => "new_order",
            Self::OrderAccepted => "order_accepted",
            Self::OrderStatusChanged => "order_status_changed",
            Self::OrderCancelled => "order_cancelled",
            Self::ProductApproved => "product_approved",
            Self::SellerApproved => "seller_approved",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    /// Email address.
    pub recipient: String,
    /// Name used in the greeting.
    pub recipient_name: String,
    /// Event details, e.g. `orderId`, `productName`, `status`.
    pub payload: Value,
}

impl Notification {
    #[must_use]
    pub fn new(
        kind: NotificationKind,
        recipient: impl Into<String>,
        recipient_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            kind,
            recipient: recipient.into(),
            recipient_name: recipient_name.into(),
            payload,
        }
    }
}

/// Delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> AppResult<()>;
}

/// Type alias for a shared notifier.
pub type NotifierService = Arc<dyn Notifier>;

/// Drops every notification.
#[derive(Clone, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _notification: &Notification) -> AppResult<()> {
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> AppResult<()> {
        info!(
            kind = %notification.kind,
            recipient = %notification.recipient,
            payload = %notification.payload,
            "Notification"
        );
        Ok(())
    }
}

/// Fire-and-forget front for a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: NotifierService,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(notifier: NotifierService) -> Self {
        Self { notifier }
    }

    /// A dispatcher that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoOpNotifier))
    }

    /// Send in the background. Must be called from within a tokio runtime.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                warn!(
                    error = %e,
                    kind = %notification.kind,
                    recipient = %notification.recipient,
                    "Failed to deliver notification"
                );
            }
        });
    }

    pub fn dispatch_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.dispatch(notification);
        }
    }
}
