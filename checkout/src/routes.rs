//! Application routes and origins
//!
//! Routes are typed so reducers never assemble paths by hand. The payment
//! popup's routes carry their data in query parameters, which
//! [`QueryParams`] reads back on the receiving side.

use crate::error::ApiError;
use crate::types::OrderNumber;
use reqwest::Url;
use std::collections::HashMap;
use std::fmt;

/// A scheme/host/port triple, as compared by the browser for `postMessage`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    /// Parses the origin of `url`
    ///
    /// Paths, queries and fragments are discarded, so
    /// `https://shop.example.com/cart?x=1` becomes `https://shop.example.com`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `url` is not an absolute URL with a host.
    pub fn parse(url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::of(&parsed))
    }

    /// Origin of an already parsed URL
    #[must_use]
    pub fn of(url: &Url) -> Self {
        Self(url.origin().ascii_serialization())
    }

    /// The serialized origin
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL for `route` on this origin
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if this origin cannot serve as a base
    /// (the opaque `null` origin).
    pub fn url_for(&self, route: &Route) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.0)
            .and_then(|base| base.join(&route.path()))
            .map_err(|e| ApiError::InvalidUrl(format!("{}{}: {e}", self.0, route.path())))?;

        if let Route::PaymentCheckout {
            order_number,
            customer_name,
        } = route
        {
            url.query_pairs_mut()
                .append_pair("orderNumber", order_number.as_str())
                .append_pair("customerName", customer_name);
        }

        Ok(url)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every page the checkout flow navigates between
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Home,
    /// `/cart`
    Cart,
    /// `/orders/{orderNumber}`
    OrderDetail(OrderNumber),
    /// `/orders/{orderNumber}/delivery`, delivery form and payment button
    OrderDelivery(OrderNumber),
    /// `/orders/payment/checkout?orderNumber=..&customerName=..`, the popup entry
    PaymentCheckout {
        /// Order to pay
        order_number: OrderNumber,
        /// Name shown to the payment provider
        customer_name: String,
    },
    /// `/orders/payment/success`, provider success redirect target
    PaymentSuccess,
    /// `/orders/payment/fail`, provider fail redirect target
    PaymentFail,
}

impl Route {
    /// Path of this route, without query parameters
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Cart => "/cart".to_string(),
            Self::OrderDetail(number) => format!("/orders/{number}"),
            Self::OrderDelivery(number) => format!("/orders/{number}/delivery"),
            Self::PaymentCheckout { .. } => "/orders/payment/checkout".to_string(),
            Self::PaymentSuccess => "/orders/payment/success".to_string(),
            Self::PaymentFail => "/orders/payment/fail".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Query parameters of an inbound URL
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    /// Reads the query of `url`; for repeated keys the first value wins
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = HashMap::new();
        for (key, value) in url.query_pairs() {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        Self(params)
    }

    /// Value of `key`, `None` when absent or blank
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}
