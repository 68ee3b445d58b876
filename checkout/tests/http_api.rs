//! `HttpStorefrontApi` against a mock storefront server

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storefront_checkout::api::{AnonymousSession, ConfirmPaymentRequest, StaticSession};
use storefront_checkout::checkout::DeliveryForm;
use storefront_checkout::order::CreateOrderRequest;
use storefront_checkout::types::{CartLine, CartLineId, Money, OrderNumber, OrderStatus};
use storefront_checkout::{ApiError, CheckoutError, HttpStorefrontApi, StorefrontApi};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpStorefrontApi {
    HttpStorefrontApi::new(
        &format!("{}/api", server.uri()),
        Arc::new(StaticSession::new("token-1")),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn cart_is_fetched_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/carts"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "cartProductId": 7,
                "cartId": 1,
                "product": {"id": 3, "name": "셔츠", "price": 1000, "stock": 5, "colors": ["RED"]},
                "quantity": 2
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let lines = client(&server).cart_lines().await.unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].id, CartLineId::new(7));
    assert_eq!(lines[0].line_total(), Money::from_won(2_000));
    assert_eq!(lines[0].option.color, None);
}

#[tokio::test]
async fn anonymous_session_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/carts/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpStorefrontApi::new(
        &format!("{}/api", server.uri()),
        Arc::new(AnonymousSession),
        Duration::from_secs(2),
    )
    .unwrap();
    api.delete_cart_line(CartLineId::new(7)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn order_creation_posts_products_with_option_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_json(json!({
            "products": [
                {"productId": 3, "quantity": 2, "optionSnapshot": {"color": "RED"}}
            ]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "orderNumber": "ORD-1",
            "totalPrice": 2000,
            "status": "ORDERED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let line: CartLine = serde_json::from_value(json!({
        "cartProductId": 7,
        "cartId": 1,
        "product": {"id": 3, "name": "셔츠", "price": 1000, "colors": ["RED", "BLUE"]},
        "quantity": 2
    }))
    .unwrap();
    let request = CreateOrderRequest::from_lines([&line]).unwrap();

    let created = api.create_order(request).await.unwrap();

    assert_eq!(created.order_number, OrderNumber::new("ORD-1"));
    assert_eq!(created.total_price, Some(Money::from_won(2_000)));
}

#[tokio::test]
async fn delivery_is_registered_with_server_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/orders/ORD-1/delivery"))
        .and(body_json(json!({
            "address1": "서울시 강남구 테헤란로 1",
            "address2": "",
            "phoneNumber": "010-1234-5678",
            "zipCode": "06236",
            "name": "홍길동",
            "message": "부재 시 경비실"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registration = DeliveryForm {
        receiver_name: " 홍길동 ".to_string(),
        phone: "010-1234-5678".to_string(),
        zip_code: "06236".to_string(),
        address1: "서울시 강남구 테헤란로 1".to_string(),
        address2: String::new(),
        message: "부재 시 경비실".to_string(),
    }
    .validate()
    .unwrap();

    client(&server)
        .register_delivery(OrderNumber::new("ORD-1"), registration)
        .await
        .unwrap();
}

#[tokio::test]
async fn order_is_fetched_with_items_delivery_and_member() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/ORD-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "orderNumber": "ORD-1",
            "items": [
                {"productId": 3, "productName": "셔츠", "price": 1000, "quantity": 1, "optionSnapshot": {"color": "RED"}},
                {"productId": 4, "productName": "바지", "price": 2000, "quantity": 2, "optionSnapshot": {}}
            ],
            "totalPrice": 5000,
            "status": "PAYMENT_COMPLETED",
            "delivery": null,
            "member": {"id": 1, "name": "홍길동"}
        })))
        .mount(&server)
        .await;

    let order = client(&server).order(OrderNumber::new("ORD-1")).await.unwrap();

    assert_eq!(order.status, OrderStatus::PaymentCompleted);
    assert!(!order.status.awaits_payment());
    assert_eq!(order.order_name().as_deref(), Some("셔츠 외 1건"));
    assert_eq!(order.member.unwrap().name, "홍길동");
}

#[tokio::test]
async fn confirm_sends_exactly_the_callback_values() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/confirm"))
        .and(body_json(json!({"paymentKey": "pk_1", "orderId": "ORD-1", "amount": 5000})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderNumber": "ORD-1",
            "amount": 5000,
            "paymentStatus": "DONE",
            "orderStatus": "PAYMENT_COMPLETED",
            "paymentKey": "pk_1",
            "approvedAt": "2025-03-01T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let confirmation = client(&server)
        .confirm_payment(ConfirmPaymentRequest {
            payment_key: "pk_1".to_string(),
            order_id: OrderNumber::new("ORD-1"),
            amount: Money::from_won(5_000),
        })
        .await
        .unwrap();

    assert_eq!(confirmation.order_status, OrderStatus::PaymentCompleted);
    assert_eq!(confirmation.payment_status, "DONE");
    assert!(confirmation.approved_at.is_some());
}

#[tokio::test]
async fn rejection_keeps_server_body_for_message_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/confirm"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "REJECT_CARD_COMPANY",
            "message": "card declined"
        })))
        .mount(&server)
        .await;

    let error = client(&server)
        .confirm_payment(ConfirmPaymentRequest {
            payment_key: "pk_1".to_string(),
            order_id: OrderNumber::new("ORD-1"),
            amount: Money::from_won(5_000),
        })
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::Rejected { status: 400, .. }));
    assert_eq!(error.user_message(), "card declined");
    assert_eq!(CheckoutError::from(error).to_string(), "card declined");
}

#[tokio::test]
async fn unauthorized_is_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/ORD-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let error = client(&server).order(OrderNumber::new("ORD-1")).await.unwrap_err();

    assert_eq!(error, ApiError::Unauthorized);
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/carts"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let error = client(&server).cart_lines().await.unwrap_err();

    assert_eq!(
        error,
        ApiError::Rejected {
            status: 502,
            body: json!("Bad Gateway"),
        }
    );
}
