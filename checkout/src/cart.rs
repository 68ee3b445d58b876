//! Cart page: line selection, totals and order draft creation
//!
//! The selection is page state only. It is never persisted and is pruned to
//! the lines that still exist every time the cart is reloaded.

use crate::api::StorefrontApi;
use crate::browser::{self, Navigator};
use crate::order::CreateOrderRequest;
use crate::routes::Route;
use crate::types::{CartLine, CartLineId, Dialog, Money, OrderNumber};
use std::collections::BTreeSet;
use std::sync::Arc;
use storefront_core::effect::Effect;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, async_effect, smallvec};

/// Cart line ids marked "to order now"
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<CartLineId>);

impl Selection {
    /// True if `id` is selected
    #[must_use]
    pub fn contains(&self, id: CartLineId) -> bool {
        self.0.contains(&id)
    }

    /// Number of selected ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selected ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = CartLineId> + '_ {
        self.0.iter().copied()
    }

    fn retain_existing(&mut self, lines: &[CartLine]) {
        self.0.retain(|id| lines.iter().any(|line| line.id == *id));
    }
}

/// State of the cart page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartState {
    /// Lines as last loaded from the server
    pub lines: Vec<CartLine>,
    /// Lines chosen for the next order
    pub selection: Selection,
    /// A cart fetch is in flight
    pub loading: bool,
    /// Line whose deletion is in flight
    pub deleting: Option<CartLineId>,
    /// An order creation is in flight
    pub placing_order: bool,
    /// Order created from this page
    pub created_order: Option<OrderNumber>,
    /// Blocking dialog
    pub dialog: Option<Dialog>,
}

impl CartState {
    /// Sum of `price * quantity` over the selected lines that still exist
    #[must_use]
    pub fn total(&self) -> Money {
        self.selected_lines().map(CartLine::line_total).sum()
    }

    /// Selected lines, in cart order
    pub fn selected_lines(&self) -> impl Iterator<Item = &CartLine> + '_ {
        self.lines
            .iter()
            .filter(|line| self.selection.contains(line.id))
    }

    /// True when the cart has lines and all of them are selected
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|line| self.selection.contains(line.id))
    }
}

/// Actions of the cart page
#[derive(Clone, Debug, PartialEq)]
pub enum CartAction {
    // Commands
    /// Fetch the cart
    Load,
    /// Select every line, or none
    SelectAll {
        /// Select (`true`) or clear (`false`)
        checked: bool,
    },
    /// Select or unselect one line
    Select {
        /// Line
        id: CartLineId,
        /// Select (`true`) or unselect (`false`)
        checked: bool,
    },
    /// Remove a line from the cart
    Delete {
        /// Line
        id: CartLineId,
    },
    /// Create an order from the selected lines
    PlaceOrder,
    /// Dismiss the dialog
    AcknowledgeDialog,

    // Effect feedback
    /// Cart fetched
    CartLoaded {
        /// Current lines
        lines: Vec<CartLine>,
    },
    /// Cart fetch failed
    CartLoadFailed {
        /// User-facing message
        message: String,
    },
    /// Line removed on the server
    LineDeleted {
        /// Line
        id: CartLineId,
    },
    /// Line removal failed
    DeleteFailed {
        /// Line
        id: CartLineId,
        /// User-facing message
        message: String,
    },
    /// Order draft created
    OrderCreated {
        /// New order's number
        order_number: OrderNumber,
    },
    /// Order draft creation failed
    OrderFailed {
        /// User-facing message
        message: String,
    },
}

/// Dependencies of the cart page
#[derive(Clone)]
pub struct CartEnvironment {
    /// Storefront API
    pub api: Arc<dyn StorefrontApi>,
    /// Navigation
    pub navigator: Arc<dyn Navigator>,
}

impl CartEnvironment {
    /// Creates a cart environment
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>, navigator: Arc<dyn Navigator>) -> Self {
        Self { api, navigator }
    }
}

/// Reducer for the cart page
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new cart reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fetch_cart(env: &CartEnvironment) -> Effect<CartAction> {
        let api = Arc::clone(&env.api);
        async_effect! {
            match api.cart_lines().await {
                Ok(lines) => Some(CartAction::CartLoaded { lines }),
                Err(error) => {
                    tracing::warn!(%error, "Failed to load cart");
                    Some(CartAction::CartLoadFailed { message: error.user_message() })
                },
            }
        }
    }
}

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = CartEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut CartState,
        action: CartAction,
        env: &CartEnvironment,
    ) -> SmallVec<[Effect<CartAction>; 4]> {
        match action {
            CartAction::Load => {
                state.loading = true;
                smallvec![Self::fetch_cart(env)]
            },

            CartAction::CartLoaded { lines } => {
                state.loading = false;
                state.lines = lines;
                let before = state.selection.len();
                state.selection.retain_existing(&state.lines);
                if state.selection.len() != before {
                    tracing::debug!(
                        dropped = before - state.selection.len(),
                        "Dropped selection of lines no longer in cart"
                    );
                }
                SmallVec::new()
            },

            CartAction::CartLoadFailed { message } => {
                state.loading = false;
                state.dialog = Some(Dialog::new(message));
                SmallVec::new()
            },

            CartAction::SelectAll { checked } => {
                state.selection = if checked {
                    Selection(state.lines.iter().map(|line| line.id).collect())
                } else {
                    Selection::default()
                };
                SmallVec::new()
            },

            CartAction::Select { id, checked } => {
                if !checked {
                    state.selection.0.remove(&id);
                } else if state.lines.iter().any(|line| line.id == id) {
                    state.selection.0.insert(id);
                } else {
                    tracing::warn!(%id, "Ignoring selection of a line not in the cart");
                }
                SmallVec::new()
            },

            CartAction::Delete { id } => {
                if let Some(pending) = state.deleting {
                    tracing::warn!(%id, %pending, "Ignoring delete while another is in flight");
                    return SmallVec::new();
                }
                if !state.lines.iter().any(|line| line.id == id) {
                    tracing::warn!(%id, "Ignoring delete of a line not in the cart");
                    return SmallVec::new();
                }

                state.deleting = Some(id);
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.delete_cart_line(id).await {
                        Ok(()) => Some(CartAction::LineDeleted { id }),
                        Err(error) => {
                            tracing::warn!(%id, %error, "Failed to delete cart line");
                            Some(CartAction::DeleteFailed { id, message: error.user_message() })
                        },
                    }
                }]
            },

            CartAction::LineDeleted { id } => {
                tracing::debug!(%id, "Cart line deleted, refreshing cart");
                state.deleting = None;
                state.loading = true;
                smallvec![Self::fetch_cart(env)]
            },

            CartAction::DeleteFailed { id: _, message } => {
                state.deleting = None;
                state.dialog = Some(Dialog::new(message));
                SmallVec::new()
            },

            CartAction::PlaceOrder => {
                if state.placing_order {
                    tracing::warn!("Ignoring order while another is being created");
                    return SmallVec::new();
                }

                let request = match CreateOrderRequest::from_lines(state.selected_lines()) {
                    Ok(request) => request,
                    Err(error) => {
                        tracing::debug!(%error, "Order rejected before submission");
                        state.dialog = Some(Dialog::new(error.to_string()));
                        return SmallVec::new();
                    },
                };

                state.placing_order = true;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.create_order(request).await {
                        Ok(created) => Some(CartAction::OrderCreated { order_number: created.order_number }),
                        Err(error) => {
                            tracing::warn!(%error, "Failed to create order");
                            Some(CartAction::OrderFailed { message: error.user_message() })
                        },
                    }
                }]
            },

            CartAction::OrderCreated { order_number } => {
                tracing::info!(%order_number, "Order draft created");
                metrics::counter!("checkout.orders.created").increment(1);
                state.placing_order = false;
                state.created_order = Some(order_number.clone());
                smallvec![browser::navigate(
                    &env.navigator,
                    Route::OrderDelivery(order_number)
                )]
            },

            CartAction::OrderFailed { message } => {
                state.placing_order = false;
                state.dialog = Some(Dialog::new(message));
                SmallVec::new()
            },

            CartAction::AcknowledgeDialog => {
                state.dialog = None;
                SmallVec::new()
            },
        }
    }
}
