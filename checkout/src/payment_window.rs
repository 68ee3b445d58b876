//! Payment popup (secondary browsing context)
//!
//! The popup lives on three routes:
//!
//! - `/orders/payment/checkout?orderNumber&customerName` fetches the order
//!   and hands it to the provider SDK.
//! - `/orders/payment/success?paymentKey&orderId&amount` confirms the payment
//!   with the server, reports to the opener and closes.
//! - `/orders/payment/fail?code&message` shows the provider's failure,
//!   reports it to the opener after a short delay and closes.
//!
//! Exactly one result message leaves the popup per lifecycle, and the
//! confirmation call is issued at most once.

use crate::api::{ConfirmPaymentRequest, StorefrontApi};
use crate::browser::{self, Navigator, PopupWindow};
use crate::channel::{PaymentMessage, WindowMessenger};
use crate::error::{CheckoutError, DEFAULT_PAYMENT_ERROR_MESSAGE};
use crate::provider::{PaymentMethod, PaymentProvider, PaymentRequest};
use crate::routes::{Origin, QueryParams, Route};
use crate::types::{Money, OrderDraft, OrderNumber, PaymentConfirmation};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::effect::Effect;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, async_effect, delay, smallvec};
use storefront_runtime::Store;

/// What the popup shows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PaymentWindowPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Fetching the order
    LoadingOrder,
    /// The provider's hosted UI has the window
    AwaitingProvider,
    /// Confirmation call in flight
    Confirming {
        /// Order being confirmed
        order_number: OrderNumber,
    },
    /// Provider failure shown before it is reported
    ShowingFailure {
        /// Provider message
        message: String,
        /// Provider error code
        code: Option<String>,
    },
    /// Blocking error inside the popup; the user closes it by hand
    Error {
        /// User-facing message
        message: String,
    },
    /// Route data missing
    CannotLoad {
        /// Why
        reason: String,
    },
    /// Navigated away in place
    Redirected(Route),
    /// Result reported and window closed
    Closed,
}

/// State of the payment popup
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentWindowState {
    /// Current phase
    pub phase: PaymentWindowPhase,
    /// Order handed to the provider
    pub order: Option<OrderDraft>,
    /// Customer name from the checkout route
    pub customer_name: Option<String>,
    /// The confirmation call was issued
    pub confirm_requested: bool,
    /// A result message was posted to the opener
    pub notified: bool,
}

/// Actions of the payment popup
#[derive(Clone, Debug, PartialEq)]
pub enum PaymentWindowAction {
    /// Popup loaded at the checkout route
    Open {
        /// Full URL including the query
        url: Url,
    },
    /// Provider redirected to the success route
    SuccessRedirect {
        /// Full URL including the query
        url: Url,
    },
    /// Provider redirected to the fail route
    FailRedirect {
        /// Full URL including the query
        url: Url,
    },
    /// Fail delay elapsed; report to the opener
    NotifyFailure {
        /// Provider message
        message: String,
        /// Provider error code
        code: Option<String>,
    },
    /// User closes the popup from an error screen
    Close,
    /// User leaves a screen that cannot load
    GoHome,

    /// Order fetched
    OrderLoaded {
        /// The order
        order: OrderDraft,
    },
    /// Order fetch failed
    OrderLoadFailed {
        /// User-facing message
        message: String,
    },
    /// The provider took over the window
    PaymentRequested,
    /// SDK load or payment initiation failed
    ProviderFailed {
        /// User-facing message
        message: String,
    },
    /// Server confirmed the payment
    ConfirmSucceeded {
        /// Confirmation
        confirmation: PaymentConfirmation,
    },
    /// Server refused the confirmation
    ConfirmFailed {
        /// Message extracted from the failure
        message: String,
    },
}

/// Dependencies of the payment popup
#[derive(Clone)]
pub struct PaymentWindowEnvironment {
    /// Storefront API
    pub api: Arc<dyn StorefrontApi>,
    /// Provider SDK
    pub provider: Arc<dyn PaymentProvider>,
    /// `window.opener`, `None` when the page was opened directly
    pub opener: Option<Arc<dyn WindowMessenger>>,
    /// The popup's own window
    pub window: Arc<dyn PopupWindow>,
    /// In-place navigation
    pub navigator: Arc<dyn Navigator>,
    /// Application origin, the only target results are posted to
    pub origin: Origin,
    /// Delay between showing a provider failure and reporting it
    pub fail_notify_delay: Duration,
}

/// Reducer for the payment popup
#[derive(Clone, Debug, Default)]
pub struct PaymentWindowReducer;

/// Store running the payment popup
pub type PaymentWindowStore =
    Store<PaymentWindowState, PaymentWindowAction, PaymentWindowEnvironment, PaymentWindowReducer>;

impl PaymentWindowReducer {
    /// Creates a new payment window reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Posts `message` to the opener and closes the window
    ///
    /// Returns `None` without an opener; the caller decides what the popup
    /// shows then.
    fn report(
        state: &mut PaymentWindowState,
        message: PaymentMessage,
        env: &PaymentWindowEnvironment,
    ) -> Option<Effect<PaymentWindowAction>> {
        let opener = Arc::clone(env.opener.as_ref()?);
        state.notified = true;
        state.phase = PaymentWindowPhase::Closed;

        let window = Arc::clone(&env.window);
        let origin = env.origin.clone();
        Some(async_effect! {
            opener.post_message(&message, &origin);
            window.close();
            None
        })
    }

    fn show_error(state: &mut PaymentWindowState, message: String) -> SmallVec<[Effect<PaymentWindowAction>; 4]> {
        state.phase = PaymentWindowPhase::Error { message };
        SmallVec::new()
    }

    fn payment_request(
        order: &OrderDraft,
        customer_name: String,
        origin: &Origin,
    ) -> Result<PaymentRequest, CheckoutError> {
        let order_name = order.order_name().ok_or(CheckoutError::EmptyOrder)?;
        Ok(PaymentRequest {
            method: PaymentMethod::Card,
            amount: order.total_price,
            order_id: order.order_number.clone(),
            order_name,
            customer_name,
            success_url: origin.url_for(&Route::PaymentSuccess)?,
            fail_url: origin.url_for(&Route::PaymentFail)?,
        })
    }

    fn confirm_request(params: &QueryParams) -> Option<ConfirmPaymentRequest> {
        Some(ConfirmPaymentRequest {
            payment_key: params.get("paymentKey")?.to_string(),
            order_id: OrderNumber::new(params.get("orderId")?),
            amount: Money::from_won(params.get("amount")?.parse().ok()?),
        })
    }
}

impl Reducer for PaymentWindowReducer {
    type State = PaymentWindowState;
    type Action = PaymentWindowAction;
    type Environment = PaymentWindowEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut PaymentWindowState,
        action: PaymentWindowAction,
        env: &PaymentWindowEnvironment,
    ) -> SmallVec<[Effect<PaymentWindowAction>; 4]> {
        match action {
            PaymentWindowAction::Open { url } => {
                let params = QueryParams::from_url(&url);
                let (Some(order_number), Some(customer_name)) =
                    (params.get("orderNumber"), params.get("customerName"))
                else {
                    let missing = if params.get("orderNumber").is_none() { "orderNumber" } else { "customerName" };
                    let error = CheckoutError::MissingRouteData(missing);
                    tracing::error!(%url, %error, "Payment popup opened without route data");
                    state.phase = PaymentWindowPhase::CannotLoad {
                        reason: error.to_string(),
                    };
                    return SmallVec::new();
                };

                let order_number = OrderNumber::new(order_number);
                state.customer_name = Some(customer_name.to_string());
                state.phase = PaymentWindowPhase::LoadingOrder;

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.order(order_number.clone()).await {
                        Ok(order) => Some(PaymentWindowAction::OrderLoaded { order }),
                        Err(error) => {
                            tracing::warn!(%order_number, %error, "Payment popup failed to load order");
                            Some(PaymentWindowAction::OrderLoadFailed { message: error.user_message() })
                        },
                    }
                }]
            },

            PaymentWindowAction::OrderLoaded { order } => {
                if !order.status.awaits_payment() {
                    tracing::warn!(
                        order_number = %order.order_number,
                        status = ?order.status,
                        "Order can no longer be paid, returning to cart"
                    );
                    state.phase = PaymentWindowPhase::Redirected(Route::Cart);
                    return smallvec![browser::navigate(&env.navigator, Route::Cart)];
                }

                let customer_name = state.customer_name.clone().unwrap_or_default();
                let request = match Self::payment_request(&order, customer_name, &env.origin) {
                    Ok(request) => request,
                    Err(error) => {
                        tracing::error!(order_number = %order.order_number, %error, "Cannot start payment");
                        return Self::show_error(state, error.to_string());
                    },
                };

                tracing::info!(
                    order_number = %request.order_id,
                    amount = request.amount.won(),
                    "Handing order to payment provider"
                );
                state.order = Some(order);
                state.phase = PaymentWindowPhase::AwaitingProvider;

                let provider = Arc::clone(&env.provider);
                smallvec![async_effect! {
                    let started = match provider.load().await {
                        Ok(()) => provider.request_payment(request).await,
                        Err(error) => Err(error),
                    };
                    match started {
                        Ok(()) => Some(PaymentWindowAction::PaymentRequested),
                        Err(error) => {
                            tracing::warn!(%error, "Payment provider failed");
                            Some(PaymentWindowAction::ProviderFailed { message: error.to_string() })
                        },
                    }
                }]
            },

            PaymentWindowAction::OrderLoadFailed { message } | PaymentWindowAction::ProviderFailed { message } => {
                Self::show_error(state, message)
            },

            PaymentWindowAction::PaymentRequested => {
                tracing::debug!("Provider UI is running");
                SmallVec::new()
            },

            PaymentWindowAction::SuccessRedirect { url } => {
                if state.confirm_requested || state.notified {
                    tracing::warn!(%url, "Ignoring repeated success redirect");
                    return SmallVec::new();
                }
                state.confirm_requested = true;

                let Some(request) = Self::confirm_request(&QueryParams::from_url(&url)) else {
                    tracing::warn!(%url, "Success redirect without paymentKey, orderId or amount");
                    let message = PaymentMessage::PaymentFail {
                        message: CheckoutError::InvalidPaymentCallback.to_string(),
                        code: None,
                    };
                    return match Self::report(state, message, env) {
                        Some(effect) => smallvec![effect],
                        None => Self::show_error(state, CheckoutError::InvalidPaymentCallback.to_string()),
                    };
                };

                tracing::info!(order_number = %request.order_id, amount = request.amount.won(), "Confirming payment");
                state.phase = PaymentWindowPhase::Confirming {
                    order_number: request.order_id.clone(),
                };

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    let order_number = request.order_id.clone();
                    match api.confirm_payment(request).await {
                        Ok(confirmation) => Some(PaymentWindowAction::ConfirmSucceeded { confirmation }),
                        Err(error) => {
                            tracing::warn!(%order_number, %error, "Payment confirmation failed");
                            Some(PaymentWindowAction::ConfirmFailed { message: error.user_message() })
                        },
                    }
                }]
            },

            PaymentWindowAction::ConfirmSucceeded { confirmation } => {
                tracing::info!(
                    order_number = %confirmation.order_number,
                    payment_status = %confirmation.payment_status,
                    "Payment confirmed"
                );
                let order_number = confirmation.order_number;
                let message = PaymentMessage::PaymentSuccess {
                    order_id: order_number.clone(),
                };
                if let Some(effect) = Self::report(state, message, env) {
                    return smallvec![effect];
                }

                let route = Route::OrderDetail(order_number);
                state.phase = PaymentWindowPhase::Redirected(route.clone());
                smallvec![browser::navigate(&env.navigator, route)]
            },

            PaymentWindowAction::ConfirmFailed { message } => {
                let report = PaymentMessage::PaymentFail {
                    message: message.clone(),
                    code: None,
                };
                match Self::report(state, report, env) {
                    Some(effect) => smallvec![effect],
                    None => Self::show_error(state, message),
                }
            },

            PaymentWindowAction::FailRedirect { url } => {
                let params = QueryParams::from_url(&url);
                let message = params.get("message").unwrap_or(DEFAULT_PAYMENT_ERROR_MESSAGE).to_string();
                let code = params.get("code").map(str::to_string);
                tracing::info!(code = code.as_deref().unwrap_or("-"), %message, "Provider reported a failure");

                state.phase = PaymentWindowPhase::ShowingFailure {
                    message: message.clone(),
                    code: code.clone(),
                };
                smallvec![delay! {
                    duration: env.fail_notify_delay,
                    action: PaymentWindowAction::NotifyFailure { message, code }
                }]
            },

            PaymentWindowAction::NotifyFailure { message, code } => {
                if state.notified {
                    return SmallVec::new();
                }
                Self::report(state, PaymentMessage::PaymentFail { message, code }, env)
                    .into_iter()
                    .collect()
            },

            PaymentWindowAction::Close => {
                state.phase = PaymentWindowPhase::Closed;
                let window = Arc::clone(&env.window);
                smallvec![async_effect! {
                    window.close();
                    None
                }]
            },

            PaymentWindowAction::GoHome => {
                state.phase = PaymentWindowPhase::Redirected(Route::Home);
                smallvec![browser::navigate(&env.navigator, Route::Home)]
            },
        }
    }
}
