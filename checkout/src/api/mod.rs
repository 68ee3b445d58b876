//! Storefront REST API
//!
//! The checkout flow reaches the backend only through [`StorefrontApi`], so
//! reducers can run against [`HttpStorefrontApi`] in production and against
//! an in-memory double in tests.

use crate::checkout::delivery::DeliveryRegistration;
use crate::error::ApiError;
use crate::order::CreateOrderRequest;
use crate::types::{CartLine, CartLineId, Money, OrderDraft, OrderNumber, PaymentConfirmation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

mod http;

pub use http::HttpStorefrontApi;

/// API call result
pub type ApiResult<T> = Result<T, ApiError>;

/// Boxed future returned by [`StorefrontApi`] methods
pub type ApiFuture<T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send>>;

/// Response of `POST /orders`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    /// Durable order number for every later step
    pub order_number: OrderNumber,
    /// Total computed by the server, when echoed
    #[serde(default)]
    pub total_price: Option<Money>,
}

/// Body of `POST /payments/confirm`
///
/// Values are passed through exactly as the provider's success redirect
/// delivered them; the server cross-checks `amount` against the order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    /// Provider payment key
    pub payment_key: String,
    /// Order number
    pub order_id: OrderNumber,
    /// Amount the provider charged
    pub amount: Money,
}

/// Storefront REST API
///
/// Abstraction over the backend endpoints the checkout flow consumes.
pub trait StorefrontApi: Send + Sync {
    /// `GET /carts` - lines in the member's cart
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be decoded
    fn cart_lines(&self) -> ApiFuture<Vec<CartLine>>;

    /// `DELETE /carts/{cartProductId}` - remove one cart line
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    fn delete_cart_line(&self, id: CartLineId) -> ApiFuture<()>;

    /// `POST /orders` - create an order draft from cart lines
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects the lines
    fn create_order(&self, request: CreateOrderRequest) -> ApiFuture<CreatedOrder>;

    /// `PATCH /orders/{orderNumber}/delivery` - attach shipping data
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects the data
    fn register_delivery(
        &self,
        order_number: OrderNumber,
        registration: DeliveryRegistration,
    ) -> ApiFuture<()>;

    /// `GET /orders/{orderNumber}` - full order with items, delivery and member
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the order does not exist
    fn order(&self, order_number: OrderNumber) -> ApiFuture<OrderDraft>;

    /// `POST /payments/confirm` - finalize a provider payment
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses the payment
    fn confirm_payment(&self, request: ConfirmPaymentRequest) -> ApiFuture<PaymentConfirmation>;
}

/// Accessor for the signed-in member's credentials
///
/// Injected into [`HttpStorefrontApi::new`] instead of reading token storage
/// ambiently.
pub trait SessionContext: Send + Sync {
    /// Bearer token for the current session, `None` when signed out
    fn access_token(&self) -> Option<String>;
}

/// Session without credentials
#[derive(Clone, Copy, Debug, Default)]
pub struct AnonymousSession;

impl SessionContext for AnonymousSession {
    fn access_token(&self) -> Option<String> {
        None
    }
}

/// Session with a fixed bearer token
#[derive(Clone, Debug)]
pub struct StaticSession {
    token: String,
}

impl StaticSession {
    /// Session presenting `token`
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl SessionContext for StaticSession {
    fn access_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}
