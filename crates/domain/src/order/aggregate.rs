//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Customer, Money, OrderId, OrderNumber};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderItem, OrderStatus};

/// Order aggregate root.
///
/// Built once by the order factory from fully resolved parts; afterwards only
/// the status moves, and only along the fulfillment state machine.
///
/// Deserialization goes through [`OrderSnapshot`] and re-checks the
/// construction invariants, so a stored payload cannot yield an order that
/// `Order::new` would have refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderSnapshot")]
pub struct Order {
    /// Storage identity.
    id: OrderId,

    /// Human-facing order number, assigned at construction.
    number: OrderNumber,

    /// Items in request order. Never empty.
    items: Vec<OrderItem>,

    /// Current fulfillment status.
    status: OrderStatus,

    /// The identified customer. `None` for anonymous orders.
    customer: Option<Customer>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Unchecked wire form of an [`Order`].
#[derive(Deserialize)]
struct OrderSnapshot {
    id: OrderId,
    number: OrderNumber,
    items: Vec<OrderItem>,
    status: OrderStatus,
    customer: Option<Customer>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderSnapshot> for Order {
    type Error = OrderError;

    fn try_from(snapshot: OrderSnapshot) -> Result<Self, Self::Error> {
        let items = snapshot
            .items
            .into_iter()
            .map(|item| OrderItem::new(item.product().clone(), item.quantity()))
            .collect::<Result<Vec<_>, _>>()?;
        check_items(&items)?;

        Ok(Self {
            id: snapshot.id,
            number: snapshot.number,
            items,
            status: snapshot.status,
            customer: snapshot.customer,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }
}

/// Items must be non-empty and their grand total must fit in `Money`.
fn check_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }

    items
        .iter()
        .try_fold(Money::zero(), |total, item| {
            total.checked_add(item.total_price())
        })
        .map(|_| ())
        .ok_or_else(|| OrderError::InvalidRequest {
            reason: "order total is out of range".to_string(),
        })
}

impl Order {
    /// Creates a new order in the `Received` status.
    ///
    /// The order is anonymous exactly when `customer` is `None`.
    pub fn new(
        number: OrderNumber,
        items: Vec<OrderItem>,
        customer: Option<Customer>,
    ) -> Result<Self, OrderError> {
        check_items(&items)?;

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            number,
            items,
            status: OrderStatus::Received,
            customer,
            created_at: now,
            updated_at: now,
        })
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn number(&self) -> OrderNumber {
        self.number
    }

    /// Returns the items in request order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns true if no customer was identified.
    pub fn is_anonymous(&self) -> bool {
        self.customer.is_none()
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity())).sum()
    }

    /// Returns the sum of all item totals.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Status transitions
impl Order {
    /// Moves the order to `target`, returning the previous status.
    ///
    /// On an illegal transition the status is left unchanged.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<OrderStatus, OrderError> {
        let previous = self.status;
        self.status = previous.transition_to(target)?;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// Moves the order one step forward along the happy path.
    pub fn advance(&mut self) -> Result<OrderStatus, OrderError> {
        let target = self.status.next().ok_or(OrderError::InvalidTransition {
            from: self.status,
            to: self.status,
        })?;
        self.transition_to(target)
    }

    /// Cancels the order.
    pub fn cancel(&mut self) -> Result<OrderStatus, OrderError> {
        self.transition_to(OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use common::Product;

    use super::*;

    fn item(id: &str, cents: i64, quantity: u32) -> OrderItem {
        OrderItem::new(Product::new(id, id, Money::from_cents(cents)), quantity).unwrap()
    }

    fn create_order() -> Order {
        Order::new(
            OrderNumber::new(1),
            vec![item("P1", 2500, 2), item("P2", 800, 1)],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_create_order() {
        let order = create_order();
        assert_eq!(order.number(), OrderNumber::new(1));
        assert_eq!(order.status(), OrderStatus::Received);
        assert!(order.is_anonymous());
        assert!(order.customer().is_none());
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn test_create_order_without_items_fails() {
        let result = Order::new(OrderNumber::new(1), vec![], None);
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn test_identified_order_is_not_anonymous() {
        let customer = Customer::new("123.456.789-00", "Ana", "ana@example.com");
        let order = Order::new(
            OrderNumber::new(2),
            vec![item("P1", 2500, 1)],
            Some(customer.clone()),
        )
        .unwrap();

        assert!(!order.is_anonymous());
        assert_eq!(order.customer(), Some(&customer));
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let order = Order::new(
            OrderNumber::new(1),
            vec![item("P3", 100, 1), item("P1", 100, 1), item("P2", 100, 1)],
            None,
        )
        .unwrap();

        let ids: Vec<&str> = order.items().iter().map(|i| i.product_id().as_str()).collect();
        assert_eq!(ids, vec!["P3", "P1", "P2"]);
    }

    #[test]
    fn test_totals() {
        let order = create_order();
        assert_eq!(order.total_quantity(), 3);
        assert_eq!(order.total_amount().cents(), 5800);
    }

    #[test]
    fn test_total_quantity_does_not_overflow() {
        let order = Order::new(
            OrderNumber::new(1),
            vec![item("P1", 1, u32::MAX), item("P2", 1, u32::MAX)],
            None,
        )
        .unwrap();

        assert_eq!(order.total_quantity(), 2 * u64::from(u32::MAX));
        assert_eq!(order.total_amount().cents(), 2 * i64::from(u32::MAX));
    }

    #[test]
    fn test_order_total_out_of_range_fails() {
        let result = Order::new(
            OrderNumber::new(1),
            vec![item("P1", i64::MAX / 2, 1), item("P2", i64::MAX / 2, 2)],
            None,
        );
        assert!(result.is_err());

        let big = item("P1", i64::MAX / 2 + 1, 1);
        let result = Order::new(OrderNumber::new(1), vec![big.clone(), big], None);
        assert!(matches!(result, Err(OrderError::InvalidRequest { .. })));
    }

    #[test]
    fn test_full_order_lifecycle() {
        let mut order = create_order();

        assert_eq!(order.advance().unwrap(), OrderStatus::Received);
        assert_eq!(order.status(), OrderStatus::InPreparation);

        order.advance().unwrap();
        assert_eq!(order.status(), OrderStatus::Ready);

        order.advance().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert!(order.is_terminal());
    }

    #[test]
    fn test_skipping_states_fails_and_keeps_status() {
        let mut order = create_order();
        let before = order.updated_at();

        let result = order.transition_to(OrderStatus::Completed);

        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Received,
                to: OrderStatus::Completed
            })
        ));
        assert_eq!(order.status(), OrderStatus::Received);
        assert_eq!(order.updated_at(), before);
    }

    #[test]
    fn test_cancel_while_preparing() {
        let mut order = create_order();
        order.advance().unwrap();

        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.is_terminal());
    }

    #[test]
    fn test_cannot_cancel_ready_order() {
        let mut order = create_order();
        order.advance().unwrap();
        order.advance().unwrap();

        let result = order.cancel();
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
        assert_eq!(order.status(), OrderStatus::Ready);
    }

    #[test]
    fn test_advance_from_terminal_fails() {
        let mut order = create_order();
        order.cancel().unwrap();

        let result = order.advance();
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_serialization() {
        let order = create_order();

        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, order);
    }

    #[test]
    fn test_deserialize_rejects_empty_items() {
        let mut json = serde_json::to_value(create_order()).unwrap();
        json["items"] = serde_json::json!([]);

        let result = serde_json::from_value::<Order>(json);
        assert!(result.unwrap_err().to_string().contains("no items"));
    }

    #[test]
    fn test_deserialize_rejects_zero_quantity() {
        let mut json = serde_json::to_value(create_order()).unwrap();
        json["items"][0]["quantity"] = serde_json::json!(0);

        assert!(serde_json::from_value::<Order>(json).is_err());
    }

    #[test]
    fn test_anonymity_follows_customer_after_deserialize() {
        let customer = Customer::new("123.456.789-00", "Ana", "ana@example.com");
        let mut json = serde_json::to_value(create_order()).unwrap();
        json["customer"] = serde_json::to_value(&customer).unwrap();
        json["anonymous"] = serde_json::json!(true);

        let order: Order = serde_json::from_value(json).unwrap();
        assert!(!order.is_anonymous());
        assert_eq!(order.customer(), Some(&customer));
    }
}
