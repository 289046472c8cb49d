//! Value objects for the order domain.

use common::{Money, Product, ProductId, TaxId};
use serde::{Deserialize, Serialize};

use super::OrderError;

/// A line of an incoming order request: a product reference and how many.
///
/// The quantity is kept signed so malformed input reaches validation instead
/// of being lost in deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderLine {
    /// Creates a new request line.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Checks the line and returns its quantity as an item quantity.
    ///
    /// `position` is the zero-based index of the line in its request and is
    /// only used to make the error message point at the right line.
    pub fn validate(&self, position: usize) -> Result<u32, OrderError> {
        if self.product_id.is_blank() {
            return Err(OrderError::InvalidRequest {
                reason: format!("item {position}: product reference is empty"),
            });
        }

        if self.quantity < 1 {
            return Err(OrderError::InvalidRequest {
                reason: format!(
                    "item {position} ({}): quantity must be positive, got {}",
                    self.product_id, self.quantity
                ),
            });
        }

        u32::try_from(self.quantity).map_err(|_| OrderError::InvalidRequest {
            reason: format!(
                "item {position} ({}): quantity {} is too large",
                self.product_id, self.quantity
            ),
        })
    }
}

/// A request to assemble an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub customer_tax_id: Option<TaxId>,
}

impl OrderRequest {
    /// Creates an anonymous request for the given lines.
    pub fn new(items: Vec<OrderLine>) -> Self {
        Self {
            items,
            customer_tax_id: None,
        }
    }

    /// Identifies the customer placing the order.
    pub fn with_customer(mut self, tax_id: impl Into<TaxId>) -> Self {
        self.customer_tax_id = Some(tax_id.into());
        self
    }

    /// Returns the tax ID to resolve, if any.
    ///
    /// A blank tax ID counts as no identification at all.
    pub fn customer_tax_id(&self) -> Option<&TaxId> {
        self.customer_tax_id.as_ref().filter(|id| !id.is_blank())
    }

    /// Validates the request shape before anything is looked up.
    pub fn validate(&self) -> Result<Vec<u32>, OrderError> {
        validate_lines(&self.items)
    }
}

/// Validates every line, returning their quantities in request order.
pub(crate) fn validate_lines(lines: &[OrderLine]) -> Result<Vec<u32>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::InvalidRequest {
            reason: "order must contain at least one item".to_string(),
        });
    }

    lines
        .iter()
        .enumerate()
        .map(|(position, line)| line.validate(position))
        .collect()
}

/// An item in an order: a copy of the resolved product and a quantity.
///
/// Immutable once built. The product is copied by value so later catalog
/// changes do not alter placed orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    product: Product,
    quantity: u32,
}

impl OrderItem {
    /// Creates a new order item.
    ///
    /// Fails if the quantity is zero or the line total does not fit in `Money`.
    pub fn new(product: Product, quantity: u32) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        if product.price.checked_multiply(quantity).is_none() {
            return Err(OrderError::InvalidRequest {
                reason: format!("total for {} x {quantity} is out of range", product.id),
            });
        }

        Ok(Self { product, quantity })
    }

    /// Returns the product snapshot.
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Returns the product identifier.
    pub fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Returns the quantity ordered.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the unit price at the time the order was placed.
    pub fn unit_price(&self) -> Money {
        self.product.price
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.product.price.multiply(self.quantity)
    }
}
