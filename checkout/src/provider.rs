//! Third-party payment provider SDK
//!
//! The popup loads the provider's SDK and hands it a [`PaymentRequest`]. The
//! provider then runs its own hosted UI and finally redirects the popup to
//! the success or fail route; that redirect, not the return value of
//! [`PaymentProvider::request_payment`], carries the payment outcome.

use crate::error::ProviderError;
use crate::types::{Money, OrderNumber};
use reqwest::Url;
use std::future::Future;
use std::pin::Pin;

/// Provider call result
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed future returned by [`PaymentProvider`] methods
pub type ProviderFuture<T> = Pin<Box<dyn Future<Output = ProviderResult<T>> + Send>>;

/// Payment method requested from the provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Credit or debit card
    #[default]
    Card,
}

/// Everything the provider needs to start its hosted payment UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Payment method
    pub method: PaymentMethod,
    /// Order total
    pub amount: Money,
    /// External order id (the order number)
    pub order_id: OrderNumber,
    /// Order name shown by the provider
    pub order_name: String,
    /// Paying customer
    pub customer_name: String,
    /// Redirect target on success
    pub success_url: Url,
    /// Redirect target on failure or cancellation
    pub fail_url: Url,
}

/// Payment provider SDK
pub trait PaymentProvider: Send + Sync {
    /// Load and initialise the SDK
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::SdkLoad`] if the SDK cannot be loaded
    fn load(&self) -> ProviderFuture<()>;

    /// Start the hosted payment UI
    ///
    /// Resolves once the provider has taken over the window.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Initiation`] if the provider refuses the request
    fn request_payment(&self, request: PaymentRequest) -> ProviderFuture<()>;
}
