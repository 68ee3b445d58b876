//! `reqwest` implementation of the storefront API

use super::{
    ApiFuture, ApiResult, ConfirmPaymentRequest, CreatedOrder, SessionContext, StorefrontApi,
};
use crate::checkout::delivery::DeliveryRegistration;
use crate::config::CheckoutConfig;
use crate::error::ApiError;
use crate::order::CreateOrderRequest;
use crate::types::{CartLine, CartLineId, OrderDraft, OrderNumber, PaymentConfirmation};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Storefront API client over HTTPS with JSON bodies
///
/// Sends `Authorization: Bearer <token>` whenever the injected session has a
/// token.
#[derive(Clone)]
pub struct HttpStorefrontApi {
    client: Client,
    base_url: Url,
    session: Arc<dyn SessionContext>,
}

impl std::fmt::Debug for HttpStorefrontApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStorefrontApi")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpStorefrontApi {
    /// Create a client for the API rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute
    /// hierarchical URL, or [`ApiError::Transport`] if the HTTP client cannot
    /// be built.
    pub fn new(
        base_url: &str,
        session: Arc<dyn SessionContext>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: parsed,
            session,
        })
    }

    /// Create a client from loaded configuration
    ///
    /// # Errors
    ///
    /// See [`HttpStorefrontApi::new`].
    pub fn from_config(
        config: &CheckoutConfig,
        session: Arc<dyn SessionContext>,
    ) -> Result<Self, ApiError> {
        Self::new(&config.api.base_url, session, config.http_timeout())
    }

    /// Base URL extended by `segments`, each percent-encoded as one segment
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let builder = self
            .client
            .request(method, url)
            .header("content-type", "application/json");

        Ok(match self.session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let text = response.text().await.unwrap_or_default();
                let body = serde_json::from_str(&text)
                    .unwrap_or(serde_json::Value::String(text));
                tracing::warn!(status = status.as_u16(), "Storefront API rejected request");
                Err(ApiError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            },
        }
    }

    async fn json<T: DeserializeOwned>(builder: RequestBuilder) -> ApiResult<T> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl StorefrontApi for HttpStorefrontApi {
    fn cart_lines(&self) -> ApiFuture<Vec<CartLine>> {
        let request = self.request(Method::GET, &["carts"]);
        Box::pin(async move { Self::json(request?).await })
    }

    fn delete_cart_line(&self, id: CartLineId) -> ApiFuture<()> {
        let request = self.request(Method::DELETE, &["carts", id.to_string().as_str()]);
        Box::pin(async move { Self::send(request?).await.map(drop) })
    }

    fn create_order(&self, request: CreateOrderRequest) -> ApiFuture<CreatedOrder> {
        let builder = self
            .request(Method::POST, &["orders"])
            .map(|b| b.json(&request));
        Box::pin(async move { Self::json(builder?).await })
    }

    fn register_delivery(
        &self,
        order_number: OrderNumber,
        registration: DeliveryRegistration,
    ) -> ApiFuture<()> {
        let builder = self
            .request(Method::PATCH, &["orders", order_number.as_str(), "delivery"])
            .map(|b| b.json(&registration));
        Box::pin(async move { Self::send(builder?).await.map(drop) })
    }

    fn order(&self, order_number: OrderNumber) -> ApiFuture<OrderDraft> {
        let request = self.request(Method::GET, &["orders", order_number.as_str()]);
        Box::pin(async move { Self::json(request?).await })
    }

    fn confirm_payment(&self, request: ConfirmPaymentRequest) -> ApiFuture<PaymentConfirmation> {
        let builder = self
            .request(Method::POST, &["payments", "confirm"])
            .map(|b| b.json(&request));
        Box::pin(async move { Self::json(builder?).await })
    }
}
