//! Storefront checkout walkthrough.
//!
//! Runs the whole checkout in-process against the in-memory backend: cart
//! selection, order draft, delivery registration, payment popup and the
//! cross-window result message. The first order is paid, the second one is
//! cancelled in the provider UI and stays payable.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=storefront_checkout=debug cargo run --bin storefront-checkout
//! ```

use anyhow::{Context, bail};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use storefront_checkout::channel::OpenerPort;
use storefront_checkout::checkout::DeliveryForm;
use storefront_checkout::mocks::{
    InMemoryStorefrontApi, OpenedPopup, RecordingNavigator, ScriptedPaymentProvider, ScriptedPopupHost,
};
use storefront_checkout::types::{CartLine, CartLineId, Money, OptionSnapshot, OrderNumber, ProductId, ProductSummary};
use storefront_checkout::{
    CartAction, CartEnvironment, CartReducer, CartState, CheckoutAction, CheckoutConfig, CheckoutEnvironment,
    CheckoutPhase, CheckoutReducer, CheckoutState, CheckoutStore, Origin, PaymentWindowAction,
    PaymentWindowEnvironment, PaymentWindowPhase, PaymentWindowReducer, PaymentWindowState, Route,
    forward_window_messages, message_channel,
};
use storefront_core::environment::SystemClock;
use storefront_core::reducer::Reducer;
use storefront_runtime::Store;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = CheckoutConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_checkout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("=== Storefront Checkout Walkthrough ===");

    let origin = Origin::parse(&config.api.origin).context("STOREFRONT_ORIGIN")?;
    let backend = InMemoryStorefrontApi::with_cart(vec![
        sample_line(1, "오버핏 셔츠", 1_000, 1, Some("BLUE")),
        sample_line(2, "와이드 팬츠", 2_000, 2, None),
        sample_line(3, "볼캡", 15_000, 1, None),
    ]);
    let navigator = Arc::new(RecordingNavigator::new());
    let popup_host = Arc::new(ScriptedPopupHost::new());

    let cart = Store::new(
        CartState::default(),
        CartReducer::new(),
        CartEnvironment::new(backend.shared(), navigator.clone()),
    );
    let checkout_env = CheckoutEnvironment {
        api: backend.shared(),
        navigator: navigator.clone(),
        popup_host: popup_host.clone(),
        clock: Arc::new(SystemClock),
        origin: origin.clone(),
        popup: config.popup.clone(),
    };

    // Paid order: shirt and pants.
    cart.send(CartAction::Load).await?;
    wait_until(&cart, "cart", |state| !state.loading && !state.lines.is_empty()).await?;
    for id in [1, 2] {
        cart.send(CartAction::Select {
            id: CartLineId::new(id),
            checked: true,
        })
        .await?;
    }
    info!(total = %cart.state(CartState::total).await, "Selected shirt and pants");
    let paid = place_order(&cart).await?;

    let (checkout, opened, port) = open_payment(&checkout_env, &popup_host, &paid).await?;
    let popup = popup_store(&backend, &opened, port, &checkout_env, &navigator);
    popup.send(PaymentWindowAction::Open { url: opened.url.clone() }).await?;
    wait_until(&popup, "provider hand-off", |state| {
        state.phase == PaymentWindowPhase::AwaitingProvider
    })
    .await?;

    let amount = backend
        .order_snapshot(&paid)
        .map(|order| order.total_price)
        .context("paid order vanished")?;
    popup
        .send(PaymentWindowAction::SuccessRedirect {
            url: success_url(&origin, "pk_demo_1", &paid, amount)?,
        })
        .await?;
    wait_until(&checkout, "payment result", |state| {
        matches!(state.phase, CheckoutPhase::Redirected(_))
    })
    .await?;
    info!(
        route = ?navigator.last_route(),
        status = ?backend.order_snapshot(&paid).map(|order| order.status),
        "Payment completed"
    );

    // Cancelled order: the cap.
    cart.send(CartAction::Load).await?;
    wait_until(&cart, "cart reload", |state| state.lines.len() == 1).await?;
    cart.send(CartAction::SelectAll { checked: true }).await?;
    let cancelled = place_order(&cart).await?;

    let (checkout, opened, port) = open_payment(&checkout_env, &popup_host, &cancelled).await?;
    let popup = popup_store(&backend, &opened, port, &checkout_env, &navigator);
    popup.send(PaymentWindowAction::Open { url: opened.url.clone() }).await?;
    let mut fail = origin.url_for(&Route::PaymentFail)?;
    fail.query_pairs_mut()
        .append_pair("code", "USER_CANCEL")
        .append_pair("message", "사용자 취소");
    popup.send(PaymentWindowAction::FailRedirect { url: fail }).await?;
    wait_until(&checkout, "payment failure", |state| state.dialog.is_some()).await?;
    info!(
        dialog = ?checkout.state(|state| state.dialog.clone()).await,
        status = ?backend.order_snapshot(&cancelled).map(|order| order.status),
        "Payment cancelled, order still payable"
    );

    info!(calls = backend.calls().len(), "=== Walkthrough complete ===");
    Ok(())
}

fn sample_line(id: u64, name: &str, price: i64, quantity: u32, color: Option<&str>) -> CartLine {
    CartLine {
        id: CartLineId::new(id),
        cart_id: 1,
        product: ProductSummary {
            id: ProductId::new(100 + id),
            name: name.to_string(),
            price: Money::from_won(price),
            stock: 20,
            colors: vec!["BLACK".to_string(), "BLUE".to_string()],
        },
        quantity,
        option: OptionSnapshot {
            color: color.map(str::to_string),
        },
    }
}

async fn place_order(
    cart: &Store<CartState, CartAction, CartEnvironment, CartReducer>,
) -> anyhow::Result<OrderNumber> {
    match cart
        .send_and_wait_for(
            CartAction::PlaceOrder,
            |action| matches!(action, CartAction::OrderCreated { .. } | CartAction::OrderFailed { .. }),
            STEP_TIMEOUT,
        )
        .await?
    {
        CartAction::OrderCreated { order_number } => {
            info!(%order_number, "Order draft created");
            Ok(order_number)
        },
        CartAction::OrderFailed { message } => bail!("order creation failed: {message}"),
        other => bail!("unexpected action {other:?}"),
    }
}

/// Opens the checkout page for `order_number`, registers delivery and waits
/// for the payment popup
async fn open_payment(
    env: &CheckoutEnvironment,
    popup_host: &ScriptedPopupHost,
    order_number: &OrderNumber,
) -> anyhow::Result<(CheckoutStore, OpenedPopup, OpenerPort)> {
    let checkout = Store::new(CheckoutState::default(), CheckoutReducer::new(), env.clone());
    let (port, inbox) = message_channel(env.origin.clone(), env.origin.clone());
    tokio::spawn(forward_window_messages(checkout.clone(), inbox));

    checkout
        .send(CheckoutAction::Load {
            order_number: Some(order_number.clone()),
        })
        .await?;
    wait_until(&checkout, "order", |state| !state.is_loading()).await?;
    if !checkout.state(CheckoutState::shows_delivery_form).await {
        bail!("order {order_number} cannot be paid");
    }

    let form = DeliveryForm {
        zip_code: "06236".to_string(),
        address1: "서울시 강남구 테헤란로 1".to_string(),
        address2: "10층".to_string(),
        phone: "010-1234-5678".to_string(),
        message: "문 앞에 놓아주세요".to_string(),
        ..checkout.state(|state| state.form.clone()).await
    };
    checkout.send(CheckoutAction::SubmitDelivery { form }).await?;
    wait_until(&checkout, "payment popup", |state| {
        matches!(state.phase, CheckoutPhase::AwaitingPayment { .. })
    })
    .await?;

    let opened = popup_host.last_opened().context("no popup opened")?;
    info!(url = %opened.url, features = %opened.features, "Payment popup opened");
    Ok((checkout, opened, port))
}

/// Payment popup store living in the window `opened`, posting to the opener
/// through `port`
fn popup_store(
    api: &InMemoryStorefrontApi,
    opened: &OpenedPopup,
    port: OpenerPort,
    env: &CheckoutEnvironment,
    navigator: &Arc<RecordingNavigator>,
) -> Store<PaymentWindowState, PaymentWindowAction, PaymentWindowEnvironment, PaymentWindowReducer> {
    Store::new(
        PaymentWindowState::default(),
        PaymentWindowReducer::new(),
        PaymentWindowEnvironment {
            api: api.shared(),
            provider: Arc::new(ScriptedPaymentProvider::new()),
            opener: Some(Arc::new(port)),
            window: opened.window.clone(),
            navigator: navigator.clone(),
            origin: env.origin.clone(),
            fail_notify_delay: env.popup.fail_notify_delay(),
        },
    )
}

/// Success redirect the provider sends the popup to
fn success_url(origin: &Origin, payment_key: &str, order_number: &OrderNumber, amount: Money) -> anyhow::Result<Url> {
    let mut url = origin.url_for(&Route::PaymentSuccess)?;
    url.query_pairs_mut()
        .append_pair("paymentKey", payment_key)
        .append_pair("orderId", order_number.as_str())
        .append_pair("amount", &amount.won().to_string());
    Ok(url)
}

async fn wait_until<S, A, E, R>(
    store: &Store<S, A, E, R>,
    what: &str,
    predicate: impl Fn(&S) -> bool,
) -> anyhow::Result<()>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    tokio::time::timeout(STEP_TIMEOUT, async {
        while !store.state(&predicate).await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .with_context(|| format!("timed out waiting for {what}"))
}
