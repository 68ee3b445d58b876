//! In-memory implementations of the checkout flow's collaborators
//!
//! Used by the demo binary and by tests. They record what they were asked to
//! do and can be scripted to fail.

use crate::api::{ApiFuture, ConfirmPaymentRequest, CreatedOrder, StorefrontApi};
use crate::browser::{Navigator, PopupFeatures, PopupHost, PopupWindow, ScreenRect};
use crate::checkout::delivery::DeliveryRegistration;
use crate::error::{ApiError, ProviderError};
use crate::order::CreateOrderRequest;
use crate::provider::{PaymentProvider, PaymentRequest, ProviderFuture};
use crate::routes::Route;
use crate::types::{
    CartLine, CartLineId, Delivery, DeliveryStatus, Member, Money, OrderDraft, OrderItem,
    OrderNumber, OrderStatus, PaymentConfirmation,
};
use reqwest::Url;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn rejected(status: u16, message: &str) -> ApiError {
    ApiError::Rejected {
        status,
        body: json!({ "message": message }),
    }
}

// ============================================================================
// Storefront API
// ============================================================================

/// Endpoints of [`StorefrontApi`], for scripting failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /carts`
    CartLines,
    /// `DELETE /carts/{id}`
    DeleteCartLine,
    /// `POST /orders`
    CreateOrder,
    /// Delivery registration
    RegisterDelivery,
    /// `GET /orders/{orderNumber}`
    Order,
    /// `POST /payments/confirm`
    ConfirmPayment,
}

/// A recorded API call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    /// `GET /carts`
    CartLines,
    /// `DELETE /carts/{id}`
    DeleteCartLine(CartLineId),
    /// `POST /orders`
    CreateOrder(CreateOrderRequest),
    /// Delivery registration
    RegisterDelivery(OrderNumber, DeliveryRegistration),
    /// `GET /orders/{orderNumber}`
    Order(OrderNumber),
    /// `POST /payments/confirm`
    ConfirmPayment(ConfirmPaymentRequest),
}

impl ApiCall {
    const fn endpoint(&self) -> Endpoint {
        match self {
            Self::CartLines => Endpoint::CartLines,
            Self::DeleteCartLine(_) => Endpoint::DeleteCartLine,
            Self::CreateOrder(_) => Endpoint::CreateOrder,
            Self::RegisterDelivery(..) => Endpoint::RegisterDelivery,
            Self::Order(_) => Endpoint::Order,
            Self::ConfirmPayment(_) => Endpoint::ConfirmPayment,
        }
    }
}

#[derive(Debug)]
struct Backend {
    cart: Vec<CartLine>,
    orders: BTreeMap<OrderNumber, OrderDraft>,
    next_order: u64,
    calls: Vec<ApiCall>,
    failures: HashMap<Endpoint, VecDeque<ApiError>>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            cart: Vec::new(),
            orders: BTreeMap::new(),
            next_order: 1,
            calls: Vec::new(),
            failures: HashMap::new(),
        }
    }
}

impl Backend {
    /// Records `call` and pops a scripted failure for its endpoint
    fn begin(&mut self, call: ApiCall) -> Result<(), ApiError> {
        let endpoint = call.endpoint();
        self.calls.push(call);
        match self.failures.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn order_mut(&mut self, order_number: &OrderNumber) -> Result<&mut OrderDraft, ApiError> {
        self.orders
            .get_mut(order_number)
            .ok_or_else(|| rejected(404, "주문을 찾을 수 없습니다."))
    }

    fn create_order(&mut self, request: &CreateOrderRequest) -> Result<CreatedOrder, ApiError> {
        let mut items = Vec::with_capacity(request.products.len());
        for line in &request.products {
            let product = self
                .cart
                .iter()
                .find(|cart_line| cart_line.product.id == line.product_id)
                .map(|cart_line| cart_line.product.clone())
                .ok_or_else(|| rejected(400, "장바구니에 없는 상품입니다."))?;

            items.push(OrderItem {
                product_id: product.id,
                product_name: product.name,
                price: product.price,
                quantity: line.quantity,
                option_snapshot: line.option_snapshot.clone(),
            });
        }

        let order_number = OrderNumber::new(format!("ORD-{}", self.next_order));
        let total_price: Money = items.iter().map(|item| item.price.times(item.quantity)).sum();
        let order = OrderDraft {
            id: self.next_order,
            order_number: order_number.clone(),
            items,
            total_price,
            status: OrderStatus::Ordered,
            delivery: None,
            member: Some(Member {
                id: 1,
                name: "홍길동".to_string(),
                email: None,
            }),
            ordered_at: None,
        };
        self.next_order += 1;

        self.cart.retain(|cart_line| {
            !request
                .products
                .iter()
                .any(|line| line.product_id == cart_line.product.id)
        });
        self.orders.insert(order_number.clone(), order);

        Ok(CreatedOrder {
            order_number,
            total_price: Some(total_price),
        })
    }

    fn confirm(&mut self, request: &ConfirmPaymentRequest) -> Result<PaymentConfirmation, ApiError> {
        let order = self.order_mut(&request.order_id)?;

        if order.status.is_paid() {
            return Err(rejected(409, "이미 결제가 완료된 주문입니다."));
        }
        if order.total_price != request.amount {
            return Err(rejected(400, "결제 금액이 일치하지 않습니다."));
        }

        order.status = OrderStatus::PaymentCompleted;

        Ok(PaymentConfirmation {
            order_number: order.order_number.clone(),
            amount: request.amount,
            payment_status: "DONE".to_string(),
            order_status: order.status,
            payment_key: request.payment_key.clone(),
            approved_at: None,
        })
    }
}

/// Storefront backend held in memory
///
/// Orders are numbered `ORD-1`, `ORD-2`, ... Creating an order removes the
/// ordered products from the cart; confirming a payment checks the amount
/// against the order total and refuses an already paid order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorefrontApi {
    backend: Arc<Mutex<Backend>>,
}

impl InMemoryStorefrontApi {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose cart holds `lines`
    #[must_use]
    pub fn with_cart(lines: Vec<CartLine>) -> Self {
        let api = Self::new();
        lock(&api.backend).cart = lines;
        api
    }

    /// Stores `order` as if it had been created earlier
    pub fn insert_order(&self, order: OrderDraft) {
        lock(&self.backend)
            .orders
            .insert(order.order_number.clone(), order);
    }

    /// Current server-side copy of an order
    #[must_use]
    pub fn order_snapshot(&self, order_number: &OrderNumber) -> Option<OrderDraft> {
        lock(&self.backend).orders.get(order_number).cloned()
    }

    /// Current cart lines
    #[must_use]
    pub fn cart_snapshot(&self) -> Vec<CartLine> {
        lock(&self.backend).cart.clone()
    }

    /// Makes the next call to `endpoint` fail with `error`
    ///
    /// Failures queue up per endpoint.
    pub fn fail_next(&self, endpoint: Endpoint, error: ApiError) {
        lock(&self.backend)
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.backend).calls.clone()
    }

    /// Number of calls made to `endpoint`
    #[must_use]
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        lock(&self.backend)
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    /// Shared as the API trait object
    #[must_use]
    pub fn shared(&self) -> Arc<dyn StorefrontApi> {
        Arc::new(self.clone())
    }
}

impl StorefrontApi for InMemoryStorefrontApi {
    fn cart_lines(&self) -> ApiFuture<Vec<CartLine>> {
        let mut backend = lock(&self.backend);
        let result = backend
            .begin(ApiCall::CartLines)
            .map(|()| backend.cart.clone());
        Box::pin(std::future::ready(result))
    }

    fn delete_cart_line(&self, id: CartLineId) -> ApiFuture<()> {
        let mut backend = lock(&self.backend);
        let result = backend.begin(ApiCall::DeleteCartLine(id)).and_then(|()| {
            let before = backend.cart.len();
            backend.cart.retain(|line| line.id != id);
            if backend.cart.len() == before {
                Err(rejected(404, "장바구니 상품을 찾을 수 없습니다."))
            } else {
                Ok(())
            }
        });
        Box::pin(std::future::ready(result))
    }

    fn create_order(&self, request: CreateOrderRequest) -> ApiFuture<CreatedOrder> {
        let mut backend = lock(&self.backend);
        let result = backend
            .begin(ApiCall::CreateOrder(request.clone()))
            .and_then(|()| backend.create_order(&request));
        Box::pin(std::future::ready(result))
    }

    fn register_delivery(
        &self,
        order_number: OrderNumber,
        registration: DeliveryRegistration,
    ) -> ApiFuture<()> {
        let mut backend = lock(&self.backend);
        let result = backend
            .begin(ApiCall::RegisterDelivery(order_number.clone(), registration.clone()))
            .and_then(|()| {
                let order = backend.order_mut(&order_number)?;
                let blank_to_none = |value: String| (!value.is_empty()).then_some(value);
                order.delivery = Some(Delivery {
                    name: registration.name,
                    phone_number: registration.phone_number,
                    zip_code: registration.zip_code,
                    address1: registration.address1,
                    address2: blank_to_none(registration.address2),
                    message: blank_to_none(registration.message),
                    courier: None,
                    tracking_number: None,
                    status: DeliveryStatus::Ready,
                });
                Ok(())
            });
        Box::pin(std::future::ready(result))
    }

    fn order(&self, order_number: OrderNumber) -> ApiFuture<OrderDraft> {
        let mut backend = lock(&self.backend);
        let result = backend
            .begin(ApiCall::Order(order_number.clone()))
            .and_then(|()| backend.order_mut(&order_number).map(|order| order.clone()));
        Box::pin(std::future::ready(result))
    }

    fn confirm_payment(&self, request: ConfirmPaymentRequest) -> ApiFuture<PaymentConfirmation> {
        let mut backend = lock(&self.backend);
        let result = backend
            .begin(ApiCall::ConfirmPayment(request.clone()))
            .and_then(|()| backend.confirm(&request));
        Box::pin(std::future::ready(result))
    }
}

// ============================================================================
// Browser
// ============================================================================

/// Navigator that records every route it is sent to
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    /// Navigator with no history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes navigated to, oldest first
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }

    /// Most recent route
    #[must_use]
    pub fn last_route(&self) -> Option<Route> {
        lock(&self.routes).last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        tracing::debug!(%route, "Navigate");
        lock(&self.routes).push(route.clone());
    }
}

/// Popup window living in this process
#[derive(Debug, Default)]
pub struct InProcessPopupWindow {
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl InProcessPopupWindow {
    /// Open window
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `close` was called
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl PopupWindow for InProcessPopupWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A popup opened through [`ScriptedPopupHost`]
#[derive(Clone, Debug)]
pub struct OpenedPopup {
    /// URL the popup was opened at
    pub url: Url,
    /// Window name
    pub name: String,
    /// Requested window features
    pub features: PopupFeatures,
    /// The window itself
    pub window: Arc<InProcessPopupWindow>,
}

/// Popup host that opens [`InProcessPopupWindow`]s, or refuses when blocked
#[derive(Debug)]
pub struct ScriptedPopupHost {
    screen: ScreenRect,
    blocked: AtomicBool,
    opened: Mutex<Vec<OpenedPopup>>,
}

impl ScriptedPopupHost {
    /// Host on a 1920x1080 screen that allows popups
    #[must_use]
    pub fn new() -> Self {
        Self::with_screen(ScreenRect::sized(1920, 1080))
    }

    /// Host on `screen` that allows popups
    #[must_use]
    pub fn with_screen(screen: ScreenRect) -> Self {
        Self {
            screen,
            blocked: AtomicBool::new(false),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Turns the popup blocker on or off
    pub fn block_popups(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Popups opened so far
    #[must_use]
    pub fn opened(&self) -> Vec<OpenedPopup> {
        lock(&self.opened).clone()
    }

    /// Most recently opened popup
    #[must_use]
    pub fn last_opened(&self) -> Option<OpenedPopup> {
        lock(&self.opened).last().cloned()
    }
}

impl Default for ScriptedPopupHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupHost for ScriptedPopupHost {
    fn screen(&self) -> ScreenRect {
        self.screen
    }

    fn open(&self, url: &Url, name: &str, features: &PopupFeatures) -> Option<Arc<dyn PopupWindow>> {
        if self.blocked.load(Ordering::SeqCst) {
            tracing::debug!(%url, "Popup blocked");
            return None;
        }

        let window = Arc::new(InProcessPopupWindow::new());
        lock(&self.opened).push(OpenedPopup {
            url: url.clone(),
            name: name.to_string(),
            features: *features,
            window: Arc::clone(&window),
        });
        Some(window)
    }
}

// ============================================================================
// Payment provider
// ============================================================================

/// Payment provider that records requests and can be scripted to fail
#[derive(Debug, Default)]
pub struct ScriptedPaymentProvider {
    load_failure: Mutex<Option<ProviderError>>,
    request_failure: Mutex<Option<ProviderError>>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl ScriptedPaymentProvider {
    /// Provider that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next SDK load fail
    pub fn fail_load(&self, error: ProviderError) {
        *lock(&self.load_failure) = Some(error);
    }

    /// Makes the next payment request fail
    pub fn fail_request(&self, error: ProviderError) {
        *lock(&self.request_failure) = Some(error);
    }

    /// Payment requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<PaymentRequest> {
        lock(&self.requests).clone()
    }
}

impl PaymentProvider for ScriptedPaymentProvider {
    fn load(&self) -> ProviderFuture<()> {
        let result = lock(&self.load_failure).take().map_or(Ok(()), Err);
        Box::pin(std::future::ready(result))
    }

    fn request_payment(&self, request: PaymentRequest) -> ProviderFuture<()> {
        lock(&self.requests).push(request);
        let result = lock(&self.request_failure).take().map_or(Ok(()), Err);
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::order::OrderLineRequest;
    use crate::test_support::cart_line;

    #[tokio::test]
    async fn create_order_numbers_orders_and_empties_cart() {
        let api = InMemoryStorefrontApi::with_cart(vec![cart_line(1, 1_000, 1), cart_line(2, 2_000, 2)]);
        let request = CreateOrderRequest::from_lines(&api.cart_snapshot()[..1]).unwrap();

        let created = api.create_order(request).await.unwrap();

        assert_eq!(created.order_number, OrderNumber::new("ORD-1"));
        assert_eq!(created.total_price, Some(Money::from_won(1_000)));
        assert_eq!(api.cart_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn confirm_checks_amount_and_refuses_second_payment() {
        let api = InMemoryStorefrontApi::with_cart(vec![cart_line(1, 1_000, 1)]);
        let request = CreateOrderRequest {
            products: vec![OrderLineRequest::from_cart_line(&cart_line(1, 1_000, 1))],
        };
        let order_number = api.create_order(request).await.unwrap().order_number;

        let confirm = |amount| ConfirmPaymentRequest {
            payment_key: "pk_1".to_string(),
            order_id: order_number.clone(),
            amount: Money::from_won(amount),
        };

        let mismatch = api.confirm_payment(confirm(999)).await.unwrap_err();
        assert_eq!(mismatch.user_message(), "결제 금액이 일치하지 않습니다.");

        let confirmation = api.confirm_payment(confirm(1_000)).await.unwrap();
        assert_eq!(confirmation.order_status, OrderStatus::PaymentCompleted);

        assert!(api.confirm_payment(confirm(1_000)).await.is_err());
        assert_eq!(api.call_count(Endpoint::ConfirmPayment), 3);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let api = InMemoryStorefrontApi::new();
        api.fail_next(Endpoint::CartLines, ApiError::Transport("offline".to_string()));

        assert!(api.cart_lines().await.is_err());
        assert!(api.cart_lines().await.is_ok());
    }

    #[test]
    fn blocked_host_opens_nothing() {
        let host = ScriptedPopupHost::new();
        host.block_popups(true);
        let url = Url::parse("http://localhost:3000/orders/payment/checkout").unwrap();
        let features = PopupFeatures::centered(host.screen(), 500, 700);

        assert!(host.open(&url, "payment", &features).is_none());
        assert!(host.opened().is_empty());
    }
}
