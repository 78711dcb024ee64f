//! Email delivery for notifications.

use async_trait::async_trait;
use fanforge_common::config::EmailConfig;
use fanforge_common::{AppError, AppResult};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use tracing::debug;

use super::notification::{Notification, NotificationKind, Notifier};

const SITE_NAME: &str = "FanForge";

/// Sends notifications as plain-text email over SMTP.
#[derive(Clone)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Build an SMTP transport from configuration.
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Config(format!("Invalid SMTP relay: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Config(format!("Invalid sender address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> AppResult<()> {
        let to = notification
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient: {e}")))?;

        let (subject, body) = render(notification);

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Internal(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP error: {e}")))?;

        debug!(kind = %notification.kind, recipient = %notification.recipient, "Email sent");
        Ok(())
    }
}

fn field<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Subject and plain-text body for a notification.
#[must_use]
pub fn render(notification: &Notification) -> (String, String) {
    let p = &notification.payload;
    let name = &notification.recipient_name;
    let order_id = field(p, "orderId");
    let product = field(p, "productName");

    let (subject, text) = match notification.kind {
        NotificationKind::OrderPlaced => (
            "Order Placed Successfully".to_string(),
            format!(
                "Your order {order_id} for {product} has been placed.\n\
                 The seller will review it shortly."
            ),
        ),
        NotificationKind::NewOrder => (
            "New Order Received".to_string(),
            format!(
                "You received a new order {order_id} for {product}.\n\
                 Buyer: {}\nShip to: {}\nPhone: {}",
                field(p, "buyerName"),
                field(p, "buyerAddress"),
                field(p, "buyerPhone"),
            ),
        ),
        NotificationKind::OrderAccepted => (
            "Order Accepted".to_string(),
            format!(
                "Your order {order_id} for {product} was accepted by {}.\n\
                 You can now see the seller's contact details on the order.",
                field(p, "businessName"),
            ),
        ),
        NotificationKind::OrderStatusChanged => {
            let status = field(p, "status");
            (
                format!("Order {status}"),
                format!("Your order {order_id} for {product} is now {status}."),
            )
        }
        NotificationKind::OrderCancelled => (
            "Order Cancelled".to_string(),
            format!("Your order {order_id} for {product} has been cancelled."),
        ),
        NotificationKind::ProductApproved => (
            "Product Approved".to_string(),
            format!("Your product {product} is approved and now visible to buyers."),
        ),
        NotificationKind::SellerApproved => (
            "Seller Account Approved".to_string(),
            format!(
                "Your seller application for {} was approved as {}.\n\
                 You can now list products.",
                field(p, "businessName"),
                field(p, "sellerType"),
            ),
        ),
    };

    (
        format!("{subject} - {SITE_NAME}"),
        format!("Hi {name},\n\n{text}\n\nThe {SITE_NAME} team"),
    )
}
