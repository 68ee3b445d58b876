//! Domain types for the checkout flow
//!
//! These mirror the JSON the storefront REST API exchanges (camelCase field
//! names, `SCREAMING_SNAKE_CASE` enums) so they can be sent and received
//! without intermediate DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

// ============================================================================
// Value Objects
// ============================================================================

/// Amount of money in Korean won
///
/// The API transfers amounts as integer won, there are no minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero won
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole won
    #[must_use]
    pub const fn from_won(won: i64) -> Self {
        Self(won)
    }

    /// Returns the amount in whole won
    #[must_use]
    pub const fn won(&self) -> i64 {
        self.0
    }

    /// Multiplies a unit price by a quantity
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}원", self.0)
    }
}

/// Cart line identifier (the API calls it `cartProductId`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLineId(u64);

impl CartLineId {
    /// Wraps a raw identifier
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CartLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Wraps a raw identifier
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Human-readable order number, the external reference for an order
///
/// The payment provider receives it as `orderId`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Wraps an order number
    #[must_use]
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Returns the order number as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chosen product option carried with a cart line or order line
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    /// Chosen color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl OptionSnapshot {
    /// Snapshot with a color
    #[must_use]
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
        }
    }
}

// ============================================================================
// Cart
// ============================================================================

/// Product as referenced from a cart line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product id
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: Money,
    /// Quantity available
    #[serde(default)]
    pub stock: u32,
    /// Colors the product is offered in, in display order
    #[serde(default)]
    pub colors: Vec<String>,
}

/// One row of the member's cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line id (`cartProductId`)
    #[serde(rename = "cartProductId")]
    pub id: CartLineId,
    /// Owning cart
    pub cart_id: u64,
    /// Referenced product
    pub product: ProductSummary,
    /// Requested quantity
    pub quantity: u32,
    /// Option chosen when the product was added, if any
    #[serde(default)]
    pub option: OptionSnapshot,
}

impl CartLine {
    /// `unit price * quantity`
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Order status as reported by the API
///
/// `ORDERED` is the created state; older deployments report it as `CREATED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, awaiting payment
    #[serde(alias = "CREATED")]
    Ordered,
    /// Payment confirmed
    PaymentCompleted,
    /// Payment failed
    PaymentFailed,
    /// Cancelled
    Cancelled,
    /// Handed to the courier
    Shipped,
    /// Delivered to the receiver
    Delivered,
}

impl OrderStatus {
    /// True once payment has been confirmed, including the fulfillment states
    /// that can only follow a payment
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::PaymentCompleted | Self::Shipped | Self::Delivered)
    }

    /// True while the order can still be paid
    #[must_use]
    pub const fn awaits_payment(&self) -> bool {
        matches!(self, Self::Ordered | Self::PaymentFailed)
    }
}

/// One line of an order, an immutable snapshot taken at creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product id
    pub product_id: ProductId,
    /// Product name at order time
    pub product_name: String,
    /// Unit price at order time
    pub price: Money,
    /// Ordered quantity
    pub quantity: u32,
    /// Chosen option
    #[serde(default)]
    pub option_snapshot: OptionSnapshot,
}

/// Member reference attached to an order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
}

/// Known courier companies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Courier {
    /// CJ Logistics
    Cj,
    /// Hanjin
    Hanjin,
    /// Lotte Global Logistics
    Lotte,
    /// Logen
    Logen,
    /// Korea Post
    Post,
    /// Kyungdong Express
    Kdexp,
}

/// Shipment status of a delivery
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Registered, not yet shipped
    #[default]
    Ready,
    /// Shipped
    Shipped,
    /// Delivered
    Delivered,
    /// Returned to sender
    Returned,
    /// Being delivered again
    Redelivery,
}

/// Shipping record of an order
///
/// Courier and tracking number are filled in by fulfillment after shipping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// Receiver name
    pub name: String,
    /// Receiver phone number
    pub phone_number: String,
    /// Zip code
    pub zip_code: String,
    /// Address line 1
    pub address1: String,
    /// Address line 2
    #[serde(default)]
    pub address2: Option<String>,
    /// Message for the courier
    #[serde(default)]
    pub message: Option<String>,
    /// Courier company, once shipped
    #[serde(default)]
    pub courier: Option<Courier>,
    /// Tracking number, once shipped
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Shipment status
    #[serde(default)]
    pub status: DeliveryStatus,
}

/// Server-side order record from creation through payment and fulfillment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Internal numeric id
    pub id: u64,
    /// External order number
    pub order_number: OrderNumber,
    /// Ordered lines
    pub items: Vec<OrderItem>,
    /// Total computed by the server at creation
    pub total_price: Money,
    /// Current status
    pub status: OrderStatus,
    /// Shipping record, once registered
    #[serde(default)]
    pub delivery: Option<Delivery>,
    /// Ordering member
    #[serde(default)]
    pub member: Option<Member>,
    /// Creation time
    #[serde(default)]
    pub ordered_at: Option<DateTime<Utc>>,
}

impl OrderDraft {
    /// Order name shown by the payment provider
    ///
    /// The first item's product name, or `"{first} 외 {N-1}건"` when the order
    /// has more than one item. `None` for an order without items.
    #[must_use]
    pub fn order_name(&self) -> Option<String> {
        let first = self.items.first()?;
        Some(match self.items.len() {
            1 => first.product_name.clone(),
            n => format!("{} 외 {}건", first.product_name, n - 1),
        })
    }
}

/// Result of the server's payment confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Confirmed order
    pub order_number: OrderNumber,
    /// Charged amount
    pub amount: Money,
    /// Provider-side payment status (e.g. `DONE`)
    pub payment_status: String,
    /// Order status after confirmation
    pub order_status: OrderStatus,
    /// Provider payment key
    pub payment_key: String,
    /// Approval time
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Blocking modal with a single acknowledgement action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    /// Message shown to the user
    pub message: String,
}

impl Dialog {
    /// Dialog showing `message`
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(name: &str) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            product_name: name.to_string(),
            price: Money::from_won(1_000),
            quantity: 1,
            option_snapshot: OptionSnapshot::default(),
        }
    }

    fn draft(items: Vec<OrderItem>) -> OrderDraft {
        OrderDraft {
            id: 1,
            order_number: OrderNumber::new("ORD-1"),
            items,
            total_price: Money::from_won(1_000),
            status: OrderStatus::Ordered,
            delivery: None,
            member: None,
            ordered_at: None,
        }
    }

    #[test]
    fn order_name_uses_first_item_and_count() {
        assert_eq!(draft(vec![item("셔츠")]).order_name().as_deref(), Some("셔츠"));
        assert_eq!(
            draft(vec![item("셔츠"), item("바지"), item("모자")])
                .order_name()
                .as_deref(),
            Some("셔츠 외 2건")
        );
        assert_eq!(draft(vec![]).order_name(), None);
    }

    #[test]
    fn money_arithmetic() {
        let total: Money = [Money::from_won(1_000).times(1), Money::from_won(2_000).times(2)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_won(5_000));
        assert_eq!(total.to_string(), "5000원");
    }

    #[test]
    fn order_status_accepts_legacy_created() {
        let status: OrderStatus = serde_json::from_value(json!("CREATED")).unwrap();
        assert_eq!(status, OrderStatus::Ordered);
        assert_eq!(
            serde_json::to_value(OrderStatus::PaymentCompleted).unwrap(),
            json!("PAYMENT_COMPLETED")
        );
        assert!(OrderStatus::Shipped.is_paid());
        assert!(OrderStatus::PaymentFailed.awaits_payment());
    }

    #[test]
    fn cart_line_decodes_api_shape() {
        let line: CartLine = serde_json::from_value(json!({
            "cartProductId": 7,
            "cartId": 3,
            "product": {"id": 11, "name": "셔츠", "price": 2000, "stock": 5, "colors": ["RED", "BLUE"]},
            "quantity": 2
        }))
        .unwrap();

        assert_eq!(line.id, CartLineId::new(7));
        assert_eq!(line.option, OptionSnapshot::default());
        assert_eq!(line.line_total(), Money::from_won(4_000));
    }
}
