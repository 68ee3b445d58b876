//! Order checkout page (opener side)
//!
//! Drives one order from its delivery form to a confirmed payment:
//!
//! 1. Load the order. An order that can no longer be paid sends the user
//!    back to the cart before any form is shown.
//! 2. Register delivery data. The popup is only opened after the server
//!    accepted it.
//! 3. Open the payment popup and wait for its result message. The popup is
//!    polled; if it disappears without reporting, the attempt counts as
//!    failed.
//! 4. Reconcile: navigate to the order on success, show the message and
//!    allow another popup attempt on failure.

pub mod delivery;

pub use delivery::{DeliveryField, DeliveryForm, DeliveryRegistration};

use crate::api::StorefrontApi;
use crate::browser::{self, Navigator, PopupFeatures, PopupHandle, PopupHost};
use crate::channel::{MessageEvent, MessageInbox};
use crate::config::PopupConfig;
use crate::error::CheckoutError;
use crate::reconcile::{Reconciliation, reconcile};
use crate::routes::{Origin, Route};
use crate::types::{Dialog, OrderDraft, OrderNumber};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use storefront_core::effect::Effect;
use storefront_core::environment::Clock;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, async_effect, delay, smallvec};
use storefront_runtime::Store;

/// Window name the payment popup is opened under
pub const PAYMENT_WINDOW_NAME: &str = "payment";

/// Customer name sent to the provider when the order has no member
const GUEST_CUSTOMER_NAME: &str = "고객";

/// Where the checkout page is
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CheckoutPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Fetching the order
    LoadingOrder,
    /// Showing the delivery form
    EnteringDelivery,
    /// Delivery registration in flight
    RegisteringDelivery,
    /// Delivery is registered; the popup can be opened (again)
    ReadyToPay,
    /// Asking the browser for a popup
    OpeningPopup {
        /// Popup attempt number
        attempt: u32,
    },
    /// Popup open, waiting for its result message
    AwaitingPayment {
        /// Popup attempt number
        attempt: u32,
        /// The open popup
        popup: PopupHandle,
    },
    /// Navigated away
    Redirected(Route),
    /// Page cannot be shown; only navigating home is offered
    CannotLoad {
        /// Why
        reason: String,
    },
}

/// State of the checkout page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckoutState {
    /// Order number from the route
    pub order_number: Option<OrderNumber>,
    /// Order as loaded
    pub order: Option<OrderDraft>,
    /// Current phase
    pub phase: CheckoutPhase,
    /// Delivery form contents
    pub form: DeliveryForm,
    /// The server accepted the delivery data for this order
    pub delivery_registered: bool,
    /// Popup attempts made so far
    pub attempts: u32,
    /// When the current popup opened
    pub awaiting_since: Option<DateTime<Utc>>,
    /// Blocking dialog
    pub dialog: Option<Dialog>,
}

impl CheckoutState {
    /// True while the page shows a spinner
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            CheckoutPhase::LoadingOrder
                | CheckoutPhase::RegisteringDelivery
                | CheckoutPhase::OpeningPopup { .. }
                | CheckoutPhase::AwaitingPayment { .. }
        )
    }

    /// True while the delivery form is rendered
    #[must_use]
    pub const fn shows_delivery_form(&self) -> bool {
        matches!(
            self.phase,
            CheckoutPhase::EnteringDelivery
                | CheckoutPhase::RegisteringDelivery
                | CheckoutPhase::ReadyToPay
                | CheckoutPhase::OpeningPopup { .. }
                | CheckoutPhase::AwaitingPayment { .. }
        )
    }

    /// Current popup attempt, if one is in progress
    #[must_use]
    pub const fn current_attempt(&self) -> Option<u32> {
        match self.phase {
            CheckoutPhase::OpeningPopup { attempt } | CheckoutPhase::AwaitingPayment { attempt, .. } => {
                Some(attempt)
            },
            _ => None,
        }
    }
}

/// Actions of the checkout page
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutAction {
    // Commands
    /// Page entered with the route's order number
    Load {
        /// `None` when the route lacks it
        order_number: Option<OrderNumber>,
    },
    /// Delivery form submitted
    SubmitDelivery {
        /// Form contents
        form: DeliveryForm,
    },
    /// Open the payment popup again after a failed attempt
    OpenPaymentPopup,
    /// Dismiss the dialog
    AcknowledgeDialog,
    /// Leave through the error screen
    GoHome,

    // Browser events
    /// A `message` event reached the window
    WindowMessage {
        /// The event, untrusted
        event: MessageEvent,
    },
    /// Time to check whether the popup is still open
    PollPopup {
        /// Attempt the poll belongs to
        attempt: u32,
    },
    /// The popup closed and the grace period passed
    PopupClosedWithoutResult {
        /// Attempt the popup belonged to
        attempt: u32,
    },

    // Effect feedback
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
    /// Delivery data accepted
    DeliveryRegistered,
    /// Delivery registration failed
    DeliveryFailed {
        /// User-facing message
        message: String,
    },
    /// The browser opened the popup
    PopupOpened {
        /// Attempt number
        attempt: u32,
        /// The popup
        popup: PopupHandle,
    },
    /// The browser blocked the popup
    PopupBlocked {
        /// Attempt number
        attempt: u32,
    },
}

/// Dependencies of the checkout page
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Storefront API
    pub api: Arc<dyn StorefrontApi>,
    /// Navigation
    pub navigator: Arc<dyn Navigator>,
    /// Popup opening
    pub popup_host: Arc<dyn PopupHost>,
    /// Clock
    pub clock: Arc<dyn Clock>,
    /// This window's origin; messages from anywhere else are dropped
    pub origin: Origin,
    /// Popup size and timing
    pub popup: PopupConfig,
}

/// Reducer for the checkout page
#[derive(Clone, Debug, Default)]
pub struct CheckoutReducer;

/// Store running the checkout page
pub type CheckoutStore = Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

impl CheckoutReducer {
    /// Creates a new checkout reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open_popup(state: &mut CheckoutState, env: &CheckoutEnvironment) -> SmallVec<[Effect<CheckoutAction>; 4]> {
        let Some(order) = state.order.as_ref() else {
            tracing::warn!("Cannot open payment popup without an order");
            return SmallVec::new();
        };

        let route = Route::PaymentCheckout {
            order_number: order.order_number.clone(),
            customer_name: order
                .member
                .as_ref()
                .map_or_else(|| GUEST_CUSTOMER_NAME.to_string(), |member| member.name.clone()),
        };
        let url = match env.origin.url_for(&route) {
            Ok(url) => url,
            Err(error) => {
                tracing::error!(%error, "Cannot build payment popup URL");
                state.phase = CheckoutPhase::ReadyToPay;
                state.dialog = Some(Dialog::new(CheckoutError::from(error).to_string()));
                return SmallVec::new();
            },
        };

        state.attempts += 1;
        let attempt = state.attempts;
        state.phase = CheckoutPhase::OpeningPopup { attempt };
        state.dialog = None;

        let features = PopupFeatures::centered(env.popup_host.screen(), env.popup.width, env.popup.height);
        tracing::info!(order_number = %order.order_number, attempt, "Opening payment popup");

        let host = Arc::clone(&env.popup_host);
        smallvec![async_effect! {
            match host.open(&url, PAYMENT_WINDOW_NAME, &features) {
                Some(window) => Some(CheckoutAction::PopupOpened { attempt, popup: PopupHandle::new(window) }),
                None => Some(CheckoutAction::PopupBlocked { attempt }),
            }
        }]
    }

    fn apply(
        state: &mut CheckoutState,
        decision: Reconciliation,
        env: &CheckoutEnvironment,
    ) -> SmallVec<[Effect<CheckoutAction>; 4]> {
        let waited_ms = state
            .awaiting_since
            .take()
            .map_or(0, |since| (env.clock.now() - since).num_milliseconds());
        metrics::counter!("checkout.payment.outcome", "result" => decision.outcome()).increment(1);

        match decision {
            Reconciliation::Navigate(route) => {
                tracing::info!(%route, waited_ms, "Payment confirmed");
                state.phase = CheckoutPhase::Redirected(route.clone());
                state.dialog = None;
                smallvec![browser::navigate(&env.navigator, route)]
            },
            Reconciliation::ShowError(message) => {
                tracing::info!(waited_ms, %message, "Payment not completed, retry allowed");
                state.phase = CheckoutPhase::ReadyToPay;
                state.dialog = Some(Dialog::new(message));
                SmallVec::new()
            },
        }
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    #[allow(clippy::cognitive_complexity)]
    fn reduce(
        &self,
        state: &mut CheckoutState,
        action: CheckoutAction,
        env: &CheckoutEnvironment,
    ) -> SmallVec<[Effect<CheckoutAction>; 4]> {
        match action {
            CheckoutAction::Load { order_number: None } => {
                let error = CheckoutError::MissingRouteData("orderNumber");
                tracing::error!(%error, "Checkout page entered without an order number");
                state.phase = CheckoutPhase::CannotLoad {
                    reason: error.to_string(),
                };
                SmallVec::new()
            },

            CheckoutAction::Load {
                order_number: Some(order_number),
            } => {
                state.order_number = Some(order_number.clone());
                state.phase = CheckoutPhase::LoadingOrder;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.order(order_number.clone()).await {
                        Ok(order) => Some(CheckoutAction::OrderLoaded { order }),
                        Err(error) => {
                            tracing::warn!(%order_number, %error, "Failed to load order");
                            Some(CheckoutAction::OrderLoadFailed { message: error.user_message() })
                        },
                    }
                }]
            },

            CheckoutAction::OrderLoaded { order } => {
                if !order.status.awaits_payment() {
                    tracing::warn!(
                        order_number = %order.order_number,
                        status = ?order.status,
                        "Order can no longer be paid, returning to cart"
                    );
                    state.order = Some(order);
                    state.phase = CheckoutPhase::Redirected(Route::Cart);
                    return smallvec![browser::navigate(&env.navigator, Route::Cart)];
                }

                tracing::debug!(order_number = %order.order_number, "Order loaded");
                if let Some(delivery) = &order.delivery {
                    state.form = DeliveryForm::from_delivery(delivery);
                } else if let Some(member) = &order.member {
                    state.form.receiver_name.clone_from(&member.name);
                }
                state.order = Some(order);
                state.phase = CheckoutPhase::EnteringDelivery;
                SmallVec::new()
            },

            CheckoutAction::OrderLoadFailed { message } => {
                state.phase = CheckoutPhase::CannotLoad { reason: message };
                SmallVec::new()
            },

            CheckoutAction::SubmitDelivery { form } => {
                if !matches!(state.phase, CheckoutPhase::EnteringDelivery | CheckoutPhase::ReadyToPay) {
                    tracing::warn!(phase = ?state.phase, "Ignoring delivery submission");
                    return SmallVec::new();
                }
                let Some(order_number) = state.order.as_ref().map(|order| order.order_number.clone()) else {
                    return SmallVec::new();
                };

                let registration = match form.validate() {
                    Ok(registration) => registration,
                    Err(error) => {
                        tracing::debug!(%error, "Delivery form rejected");
                        state.form = form;
                        state.dialog = Some(Dialog::new(error.to_string()));
                        return SmallVec::new();
                    },
                };

                state.form = form;
                state.phase = CheckoutPhase::RegisteringDelivery;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.register_delivery(order_number.clone(), registration).await {
                        Ok(()) => Some(CheckoutAction::DeliveryRegistered),
                        Err(error) => {
                            tracing::warn!(%order_number, %error, "Failed to register delivery");
                            Some(CheckoutAction::DeliveryFailed { message: error.user_message() })
                        },
                    }
                }]
            },

            CheckoutAction::DeliveryRegistered => {
                if state.phase != CheckoutPhase::RegisteringDelivery {
                    return SmallVec::new();
                }
                state.delivery_registered = true;
                Self::open_popup(state, env)
            },

            CheckoutAction::DeliveryFailed { message } => {
                state.phase = CheckoutPhase::EnteringDelivery;
                state.dialog = Some(Dialog::new(message));
                SmallVec::new()
            },

            CheckoutAction::OpenPaymentPopup => {
                if state.phase != CheckoutPhase::ReadyToPay || !state.delivery_registered {
                    tracing::warn!(phase = ?state.phase, "Ignoring payment popup request");
                    return SmallVec::new();
                }
                Self::open_popup(state, env)
            },

            CheckoutAction::PopupOpened { attempt, popup } => {
                if state.phase != (CheckoutPhase::OpeningPopup { attempt }) {
                    tracing::warn!(attempt, "Ignoring popup from a stale attempt");
                    return SmallVec::new();
                }
                state.phase = CheckoutPhase::AwaitingPayment { attempt, popup };
                state.awaiting_since = Some(env.clock.now());
                smallvec![delay! {
                    duration: env.popup.poll_interval(),
                    action: CheckoutAction::PollPopup { attempt }
                }]
            },

            CheckoutAction::PopupBlocked { attempt } => {
                if state.phase != (CheckoutPhase::OpeningPopup { attempt }) {
                    return SmallVec::new();
                }
                tracing::warn!(attempt, "Payment popup was blocked");
                metrics::counter!("checkout.popup.blocked").increment(1);
                state.phase = CheckoutPhase::ReadyToPay;
                state.dialog = Some(Dialog::new(CheckoutError::PopupBlocked.to_string()));
                SmallVec::new()
            },

            CheckoutAction::PollPopup { attempt } => match &state.phase {
                CheckoutPhase::AwaitingPayment {
                    attempt: current,
                    popup,
                } if *current == attempt => {
                    if popup.is_closed() {
                        tracing::debug!(attempt, "Payment popup closed, waiting for a late result");
                        smallvec![delay! {
                            duration: env.popup.close_grace(),
                            action: CheckoutAction::PopupClosedWithoutResult { attempt }
                        }]
                    } else {
                        smallvec![delay! {
                            duration: env.popup.poll_interval(),
                            action: CheckoutAction::PollPopup { attempt }
                        }]
                    }
                },
                _ => SmallVec::new(),
            },

            CheckoutAction::PopupClosedWithoutResult { attempt } => {
                if state.current_attempt() != Some(attempt) {
                    return SmallVec::new();
                }
                tracing::warn!(attempt, "Payment popup closed without reporting a result");
                Self::apply(
                    state,
                    Reconciliation::ShowError(CheckoutError::PopupClosed.to_string()),
                    env,
                )
            },

            CheckoutAction::WindowMessage { event } => {
                if event.origin != env.origin {
                    tracing::warn!(origin = %event.origin, "Ignoring message from foreign origin");
                    return SmallVec::new();
                }
                let message = match event.payment_message() {
                    Ok(message) => message,
                    Err(error) => {
                        tracing::debug!(%error, "Ignoring message that is not a payment result");
                        return SmallVec::new();
                    },
                };

                let expected = match state.phase {
                    CheckoutPhase::OpeningPopup { .. } | CheckoutPhase::AwaitingPayment { .. } => true,
                    // A success can trail an attempt already given up on.
                    CheckoutPhase::ReadyToPay => {
                        matches!(message, crate::channel::PaymentMessage::PaymentSuccess { .. })
                    },
                    _ => false,
                };
                if !expected {
                    tracing::warn!(phase = ?state.phase, "Ignoring payment result outside of a payment attempt");
                    return SmallVec::new();
                }

                Self::apply(state, reconcile(message), env)
            },

            CheckoutAction::AcknowledgeDialog => {
                state.dialog = None;
                SmallVec::new()
            },

            CheckoutAction::GoHome => {
                state.phase = CheckoutPhase::Redirected(Route::Home);
                smallvec![browser::navigate(&env.navigator, Route::Home)]
            },
        }
    }
}

/// Feeds the window's `message` events into the checkout store
///
/// Runs until the inbox closes or the store stops accepting actions. Origin
/// and payload checks happen in the reducer.
pub async fn forward_window_messages(store: CheckoutStore, mut inbox: MessageInbox) {
    while let Some(event) = inbox.recv().await {
        if let Err(error) = store.send(CheckoutAction::WindowMessage { event }).await {
            tracing::warn!(%error, "Stopped forwarding window messages");
            break;
        }
    }
}
