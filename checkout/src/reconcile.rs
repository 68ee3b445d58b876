//! Order status reconciliation on the opener side
//!
//! The popup has already confirmed the payment with the server by the time a
//! result arrives, so the opener only decides where the user goes next. It
//! does not fetch or validate the payment again.

use crate::channel::PaymentMessage;
use crate::error::DEFAULT_PAYMENT_ERROR_MESSAGE;
use crate::routes::Route;

/// What the opener does with a payment result
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// Payment confirmed: move forward to this route
    Navigate(Route),
    /// Payment failed: show this message and keep the order payable
    ShowError(String),
}

impl Reconciliation {
    /// Metric label for the outcome
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "success",
            Self::ShowError(_) => "failure",
        }
    }
}

/// Decides the opener's reaction to a payment result
#[must_use]
pub fn reconcile(message: PaymentMessage) -> Reconciliation {
    match message {
        PaymentMessage::PaymentSuccess { order_id } => Reconciliation::Navigate(Route::OrderDetail(order_id)),
        PaymentMessage::PaymentFail { message, code } => {
            tracing::debug!(code = code.as_deref().unwrap_or("-"), "Payment failed in popup");
            if message.trim().is_empty() {
                Reconciliation::ShowError(DEFAULT_PAYMENT_ERROR_MESSAGE.to_string())
            } else {
                Reconciliation::ShowError(message)
            }
        },
    }
}
