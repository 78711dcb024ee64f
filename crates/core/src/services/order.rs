//! Order placement and fulfilment.

use std::collections::HashMap;

use fanforge_common::{AppError, AppResult, IdGenerator};
use fanforge_db::entities::{OrderStatus, order, product, seller_profile, user};
use fanforge_db::repositories::OrderFilter;
use fanforge_db::{Mutation, MutationSet, Store, StoreTransaction};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::actor::Actor;
use crate::approval::can_transact;
use crate::cascade::now;
use crate::order_state::{advance_notification, plan_advance, plan_cancel};
use crate::services::notification::{Notification, NotificationDispatcher, NotificationKind};
use crate::services::seller::{transacting_seller, transacting_seller_readonly};

/// Input for placing an order.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderInput {
    #[validate(length(min = 1))]
    pub product_id: String,

    #[validate(length(min = 5, max = 1024))]
    pub buyer_address: String,

    #[validate(length(min = 10, max = 32))]
    pub buyer_phone: String,

    #[validate(length(max = 2048))]
    pub buyer_notes: Option<String>,
}

/// How to reach a seller. Withheld from the buyer until the order is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerContact {
    pub email: String,
    pub phone_number: String,
}

/// An order as its buyer sees it.
#[derive(Debug, Clone)]
pub struct BuyerOrder {
    pub order: order::Model,
    pub product: Option<product::Model>,
    pub seller: Option<seller_profile::Model>,
    pub seller_contact: Option<SellerContact>,
}

/// An order as its seller sees it.
#[derive(Debug, Clone)]
pub struct SellerOrder {
    pub order: order::Model,
    pub product: Option<product::Model>,
    pub buyer: Option<user::Model>,
}

fn order_payload(order: &order::Model, product_name: &str) -> serde_json::Value {
    json!({
        "orderId": order.id,
        "productId": order.product_id,
        "productName": product_name,
        "status": order.status,
    })
}

/// Lock two users in id order, so concurrent placements between the same
/// pair of people never wait on each other.
async fn lock_users(
    tx: &mut dyn StoreTransaction,
    buyer_id: &str,
    owner_id: &str,
) -> AppResult<(Option<user::Model>, Option<user::Model>)> {
    if buyer_id == owner_id {
        let user = tx.user(buyer_id).await?;
        return Ok((user.clone(), user));
    }
    if buyer_id < owner_id {
        let buyer = tx.user(buyer_id).await?;
        let owner = tx.user(owner_id).await?;
        Ok((buyer, owner))
    } else {
        let owner = tx.user(owner_id).await?;
        let buyer = tx.user(buyer_id).await?;
        Ok((buyer, owner))
    }
}

/// Order lifecycle for buyers and sellers.
#[derive(Clone)]
pub struct OrderService {
    store: Store,
    notifications: NotificationDispatcher,
    id_gen: IdGenerator,
}

impl OrderService {
    #[must_use]
    pub const fn new(store: Store, notifications: NotificationDispatcher) -> Self {
        Self {
            store,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Place a pending order for an approved product.
    pub async fn place(&self, actor: &Actor, input: PlaceOrderInput) -> AppResult<order::Model> {
        input.validate()?;

        let unavailable = || AppError::NotFound("Product not available".to_string());

        // Unlocked reads find the rows to lock; the gate is re-checked under lock.
        let seller_id = self
            .store
            .find_product(&input.product_id)
            .await?
            .map(|p| p.seller_id)
            .ok_or_else(unavailable)?;
        let owner_id = self
            .store
            .find_seller_profile(&seller_id)
            .await?
            .map(|s| s.user_id)
            .ok_or_else(unavailable)?;

        let mut tx = self.store.begin().await?;
        let (buyer, seller_owner) = lock_users(tx.as_mut(), &actor.user_id, &owner_id).await?;
        let buyer = buyer
            .filter(|u| !u.is_deleted)
            .ok_or(AppError::Unauthorized)?;
        let seller = tx.seller_profile(&seller_id).await?.ok_or_else(unavailable)?;
        let product = tx
            .product(&input.product_id)
            .await?
            .filter(|p| p.seller_id == seller.id)
            .ok_or_else(unavailable)?;

        if !can_transact(&seller, &product) {
            return Err(unavailable());
        }
        if seller.user_id == buyer.id {
            return Err(AppError::Forbidden(
                "You cannot order your own product".to_string(),
            ));
        }
        let seller_owner = seller_owner.ok_or_else(unavailable)?;

        let at = now();
        let order = order::Model {
            id: self.id_gen.generate(),
            buyer_id: buyer.id.clone(),
            seller_id: seller.id.clone(),
            product_id: product.id.clone(),
            buyer_address: input.buyer_address,
            buyer_phone: input.buyer_phone,
            buyer_notes: input.buyer_notes,
            status: OrderStatus::Pending,
            is_cancelled: false,
            cancellation_reason: None,
            created_at: at,
            updated_at: None,
        };
        let set = MutationSet::new("place_order", at).with(Mutation::InsertOrder(order.clone()));
        tx.apply(&set).await?;
        tx.commit().await?;

        info!(order_id = %order.id, product_id = %product.id, buyer_id = %buyer.id, "Order placed");

        let payload = order_payload(&order, &product.name);
        let mut seller_payload = payload.clone();
        seller_payload["buyerName"] = json!(buyer.full_name);
        seller_payload["buyerAddress"] = json!(order.buyer_address);
        seller_payload["buyerPhone"] = json!(order.buyer_phone);
        self.notifications.dispatch_all([
            Notification::new(
                NotificationKind::OrderPlaced,
                &buyer.email,
                &buyer.full_name,
                payload,
            ),
            Notification::new(
                NotificationKind::NewOrder,
                &seller_owner.email,
                &seller.business_name,
                seller_payload,
            ),
        ]);

        Ok(order)
    }

    /// The actor's orders as a buyer, newest first.
    pub async fn list_for_buyer(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<BuyerOrder>> {
        let orders = self
            .store
            .list_orders(&OrderFilter {
                buyer_id: Some(actor.user_id.clone()),
                status,
                limit: 100,
                ..Default::default()
            })
            .await?;

        let products = self.products_by_id(&orders).await?;
        let seller_ids: Vec<String> = orders.iter().map(|o| o.seller_id.clone()).collect();
        let sellers: HashMap<String, seller_profile::Model> = self
            .store
            .find_seller_profiles(&seller_ids)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let owner_ids: Vec<String> = sellers.values().map(|s| s.user_id.clone()).collect();
        let owners: HashMap<String, user::Model> = self
            .store
            .find_users(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let seller = sellers.get(&order.seller_id).cloned();
                // Contact details only once the seller has taken the order.
                let seller_contact = seller
                    .as_ref()
                    .filter(|_| order.status != OrderStatus::Pending)
                    .and_then(|s| owners.get(&s.user_id))
                    .map(|u| SellerContact {
                        email: u.email.clone(),
                        phone_number: u.phone_number.clone(),
                    });
                BuyerOrder {
                    product: products.get(&order.product_id).cloned(),
                    seller,
                    seller_contact,
                    order,
                }
            })
            .collect())
    }

    /// Orders received by the actor's seller profile, newest first.
    pub async fn list_for_seller(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<SellerOrder>> {
        let seller = transacting_seller_readonly(&self.store, actor).await?;
        let orders = self
            .store
            .list_orders(&OrderFilter {
                seller_id: Some(seller.id),
                status,
                limit: 100,
                ..Default::default()
            })
            .await?;

        let products = self.products_by_id(&orders).await?;
        let buyer_ids: Vec<String> = orders.iter().map(|o| o.buyer_id.clone()).collect();
        let buyers: HashMap<String, user::Model> = self
            .store
            .find_users(&buyer_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| SellerOrder {
                product: products.get(&order.product_id).cloned(),
                buyer: buyers.get(&order.buyer_id).cloned(),
                order,
            })
            .collect())
    }

    /// Move an order one step forward on behalf of its seller.
    pub async fn advance(
        &self,
        actor: &Actor,
        order_id: &str,
        requested: OrderStatus,
    ) -> AppResult<order::Model> {
        let mut tx = self.store.begin().await?;
        let seller = transacting_seller(tx.as_mut(), actor).await?;
        let order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        let set = plan_advance(&order, requested, &seller.id, now())?;
        tx.apply(&set).await?;
        let updated = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        tx.commit().await?;

        info!(order_id = %order_id, from = %order.status, to = %requested, "Order advanced");

        let buyer = self.store.find_user(&order.buyer_id).await?;
        let product = self.store.find_product(&order.product_id).await?;

        if let Some(buyer) = buyer.filter(|b| !b.is_deleted) {
            let mut payload = order_payload(&updated, product.as_ref().map_or("", |p| p.name.as_str()));
            payload["businessName"] = json!(seller.business_name);
            self.notifications.dispatch(Notification::new(
                advance_notification(requested),
                buyer.email,
                buyer.full_name,
                payload,
            ));
        }
        Ok(updated)
    }

    /// Cancel a pending order on behalf of its buyer.
    pub async fn cancel(&self, actor: &Actor, order_id: &str) -> AppResult<order::Model> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        let set = plan_cancel(&order, &actor.user_id, now())?;
        tx.apply(&set).await?;
        let cancelled = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        tx.commit().await?;

        info!(order_id = %order_id, buyer_id = %actor.user_id, "Order cancelled");

        let buyer = self.store.find_user(&order.buyer_id).await?;
        let product = self.store.find_product(&order.product_id).await?;

        if let Some(buyer) = buyer {
            self.notifications.dispatch(Notification::new(
                NotificationKind::OrderCancelled,
                buyer.email,
                buyer.full_name,
                order_payload(&cancelled, product.as_ref().map_or("", |p| p.name.as_str())),
            ));
        }
        Ok(cancelled)
    }

    async fn products_by_id(
        &self,
        orders: &[order::Model],
    ) -> AppResult<HashMap<String, product::Model>> {
        let ids: Vec<String> = orders.iter().map(|o| o.product_id.clone()).collect();
        Ok(self
            .store
            .find_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};
    use fanforge_db::entities::{CancellationReason, UserRole};
    use fanforge_db::{LockedTable, MemoryFailure};

    async fn marketplace() -> Fixture {
        let fx = Fixture::new().await;
        fx.seed_user("s1", UserRole::Seller).await;
        fx.seed_seller("sp1", "s1", true).await;
        fx.seed_product("p1", "sp1", true).await;
        fx.seed_user("b1", UserRole::Buyer).await;
        fx
    }

    fn buyer() -> Actor {
        testing::actor("b1", UserRole::Buyer)
    }

    fn seller() -> Actor {
        testing::actor("s1", UserRole::Seller)
    }

    #[tokio::test]
    async fn test_place_creates_pending_order_and_notifies_both_sides() {
        let fx = marketplace().await;

        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.seller_id, "sp1");
        assert!(!order.is_cancelled);

        let sent = fx.notifier.wait_for(2).await;
        let kinds: Vec<_> = sent.iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&NotificationKind::OrderPlaced));
        assert!(kinds.contains(&NotificationKind::NewOrder));
        let new_order = sent.iter().find(|n| n.kind == NotificationKind::NewOrder).unwrap();
        assert_eq!(new_order.recipient, "s1@example.com");
    }

    #[tokio::test]
    async fn test_self_purchase_is_forbidden_and_creates_nothing() {
        let fx = marketplace().await;

        let result = fx.orders.place(&seller(), testing::place_input("p1")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let orders = fx.store.list_orders(&OrderFilter::default()).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_place_requires_gate() {
        let fx = marketplace().await;
        fx.seed_product("p2", "sp1", false).await;

        let result = fx.orders.place(&buyer(), testing::place_input("p2")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = fx.orders.place(&buyer(), testing::place_input("missing")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_buyer_cancel_then_advance_fails() {
        let fx = marketplace().await;
        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();

        let cancelled = fx.orders.cancel(&buyer(), &order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.is_cancelled);
        assert_eq!(
            cancelled.cancellation_reason,
            Some(CancellationReason::BuyerRequest)
        );

        let result = fx
            .orders
            .advance(&seller(), &order.id, OrderStatus::Accepted)
            .await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        let again = fx.orders.cancel(&buyer(), &order.id).await;
        assert!(matches!(again, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_full_fulfilment_path() {
        let fx = marketplace().await;
        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();

        let skip = fx
            .orders
            .advance(&seller(), &order.id, OrderStatus::Shipped)
            .await;
        assert!(matches!(skip, Err(AppError::InvalidTransition(_))));

        for status in [
            OrderStatus::Accepted,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let updated = fx.orders.advance(&seller(), &order.id, status).await.unwrap();
            assert_eq!(updated.status, status);
        }

        let done = fx
            .orders
            .advance(&seller(), &order.id, OrderStatus::Delivered)
            .await;
        assert!(matches!(done, Err(AppError::InvalidTransition(_))));

        let cancel = fx.orders.cancel(&buyer(), &order.id).await;
        assert!(matches!(cancel, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_accept_sends_contact_notification() {
        let fx = marketplace().await;
        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();
        fx.notifier.wait_for(2).await;

        fx.orders
            .advance(&seller(), &order.id, OrderStatus::Accepted)
            .await
            .unwrap();

        let sent = fx.notifier.wait_for(3).await;
        assert_eq!(sent[2].kind, NotificationKind::OrderAccepted);
        assert_eq!(sent[2].recipient, "b1@example.com");
    }

    #[tokio::test]
    async fn test_other_seller_cannot_advance() {
        let fx = marketplace().await;
        fx.seed_user("s2", UserRole::Seller).await;
        fx.seed_seller("sp2", "s2", true).await;
        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();

        let result = fx
            .orders
            .advance(&testing::actor("s2", UserRole::Seller), &order.id, OrderStatus::Accepted)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_contact_hidden_while_pending() {
        let fx = marketplace().await;
        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();

        let listed = fx.orders.list_for_buyer(&buyer(), None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].seller_contact.is_none());
        assert!(listed[0].seller.is_some());

        fx.orders
            .advance(&seller(), &order.id, OrderStatus::Accepted)
            .await
            .unwrap();
        let listed = fx.orders.list_for_buyer(&buyer(), None).await.unwrap();
        let contact = listed[0].seller_contact.clone().unwrap();
        assert_eq!(contact.email, "s1@example.com");

        let incoming = fx.orders.list_for_seller(&seller(), None).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].buyer.as_ref().unwrap().id, "b1");
    }

    #[tokio::test]
    async fn test_failed_advance_leaves_status() {
        let fx = marketplace().await;
        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();

        fx.memory.set_failure(MemoryFailure::OnCommit).await;
        let result = fx
            .orders
            .advance(&seller(), &order.id, OrderStatus::Accepted)
            .await;
        assert!(result.is_err());
        fx.memory.clear_failure().await;

        let stored = fx.store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_order_paths_lock_in_table_order() {
        let fx = marketplace().await;
        fx.memory.clear_lock_trace();

        let order = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();
        fx.orders
            .advance(&seller(), &order.id, OrderStatus::Accepted)
            .await
            .unwrap();
        let second = fx.orders.place(&buyer(), testing::place_input("p1")).await.unwrap();
        fx.orders.cancel(&buyer(), &second.id).await.unwrap();

        use LockedTable::{Order, Product, SellerProfile, User};
        let place = vec![User, User, SellerProfile, Product];
        assert_eq!(
            fx.memory.lock_trace(),
            vec![
                place.clone(),
                vec![SellerProfile, Order],
                place,
                vec![Order],
            ]
        );
    }

    #[tokio::test]
    async fn test_place_keeps_lock_order_for_buyers_on_either_side_of_owner() {
        let fx = Fixture::new().await;
        fx.seed_user("m1", UserRole::Seller).await;
        fx.seed_seller("sp1", "m1", true).await;
        fx.seed_product("p1", "sp1", true).await;
        fx.seed_user("a1", UserRole::Buyer).await;
        fx.seed_user("z1", UserRole::Buyer).await;
        fx.memory.clear_lock_trace();

        for id in ["a1", "z1"] {
            let actor = testing::actor(id, UserRole::Buyer);
            let order = fx.orders.place(&actor, testing::place_input("p1")).await.unwrap();
            assert_eq!(order.buyer_id, id);
        }

        for trace in fx.memory.lock_trace() {
            assert!(trace.is_sorted(), "rows locked out of order: {trace:?}");
        }
    }
}
