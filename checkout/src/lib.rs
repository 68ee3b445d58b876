//! # Storefront Checkout
//!
//! Order checkout and payment reconciliation for the storefront.
//!
//! The flow spans three browsing contexts, each a reducer over its own page
//! state:
//!
//! ```text
//!  cart page                 checkout page (opener)            payment popup
//! ┌─────────────┐ POST     ┌───────────────────────┐ open   ┌──────────────────┐
//! │ CartReducer │ /orders  │ CheckoutReducer       │──────► │ PaymentWindow-   │
//! │ selection,  │────────► │ guard, delivery,      │        │ Reducer          │
//! │ total       │          │ popup, reconciliation │ ◄──────│ SDK, confirm     │
//! └─────────────┘          └───────────────────────┘ post-  └──────────────────┘
//!                                                    Message
//! ```
//!
//! - [`cart`]: selection set and order draft creation
//! - [`checkout`]: terminal-state guard, delivery registration, popup
//!   orchestration and the opener's message listener
//! - [`payment_window`]: provider hand-off and success/fail redirect handling
//! - [`channel`]: the `PAYMENT_SUCCESS | PAYMENT_FAIL` message union and the
//!   in-process `postMessage` channel
//! - [`api`]: the storefront REST API behind a trait, with a `reqwest` client
//! - [`mocks`]: in-memory doubles for every dependency

pub mod api;
pub mod browser;
pub mod cart;
pub mod channel;
pub mod checkout;
pub mod config;
pub mod error;
pub mod mocks;
pub mod order;
pub mod payment_window;
pub mod provider;
pub mod reconcile;
pub mod routes;
pub mod types;

#[cfg(test)]
mod test_support;

pub use api::{HttpStorefrontApi, SessionContext, StorefrontApi};
pub use cart::{CartAction, CartEnvironment, CartReducer, CartState};
pub use channel::{MessageEvent, MessageInbox, PaymentMessage, WindowMessenger, message_channel};
pub use checkout::{
    CheckoutAction, CheckoutEnvironment, CheckoutPhase, CheckoutReducer, CheckoutState, CheckoutStore,
    forward_window_messages,
};
pub use config::CheckoutConfig;
pub use error::{ApiError, CheckoutError, FailureCause, ProviderError};
pub use payment_window::{
    PaymentWindowAction, PaymentWindowEnvironment, PaymentWindowPhase, PaymentWindowReducer,
    PaymentWindowState, PaymentWindowStore,
};
pub use routes::{Origin, Route};
