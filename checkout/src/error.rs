//! Error types for the checkout flow

use crate::checkout::delivery::DeliveryField;
use serde_json::{Value, json};
use thiserror::Error;

/// Fallback shown when a failure carries no usable message
pub const DEFAULT_PAYMENT_ERROR_MESSAGE: &str = "결제 승인 중 오류가 발생했습니다.";

/// Errors that can occur when calling the storefront REST API
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS)
    #[error("Request failed: {0}")]
    Transport(String),

    /// Unauthorized - missing or expired session
    #[error("로그인이 만료되었습니다. 다시 로그인해주세요.")]
    Unauthorized,

    /// The API answered with a non-success status
    #[error("API error (status {status})")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error body as returned by the server (JSON, or a string if it was not JSON)
        body: Value,
    },

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    Decode(String),

    /// Could not build a request URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The failure as the UI sees it
    ///
    /// Rejections become the plain object `{status, data}` wrapping the
    /// server body; everything else is an error with its own message.
    #[must_use]
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::Rejected { status, body } => FailureCause::Object(json!({
                "status": status,
                "data": body,
            })),
            other => FailureCause::Error {
                message: other.to_string(),
            },
        }
    }

    /// Human-readable message, see [`FailureCause::user_message`]
    #[must_use]
    pub fn user_message(&self) -> String {
        self.cause().user_message()
    }
}

/// Something that went wrong, in the shapes a failure can take
#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    /// An error value with its own message
    Error {
        /// The error's message, possibly empty
        message: String,
    },
    /// A plain object, typically wrapping a server error body
    Object(Value),
}

impl FailureCause {
    /// Error with a message
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Extracts the message shown to the user
    ///
    /// Precedence: the error's own message, then a nested `data.message`,
    /// then a top-level `message`, then [`DEFAULT_PAYMENT_ERROR_MESSAGE`].
    /// Blank strings count as absent.
    #[must_use]
    pub fn user_message(&self) -> String {
        let found = match self {
            Self::Error { message } => non_blank(Some(message.as_str())),
            Self::Object(value) => non_blank(value.pointer("/data/message").and_then(Value::as_str))
                .or_else(|| non_blank(value.get("message").and_then(Value::as_str))),
        };

        found.map_or_else(|| DEFAULT_PAYMENT_ERROR_MESSAGE.to_string(), ToOwned::to_owned)
    }
}

fn non_blank(message: Option<&str>) -> Option<&str> {
    message.filter(|m| !m.trim().is_empty())
}

/// User-facing checkout errors
///
/// `Display` is the Korean text shown in the blocking dialog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckoutError {
    /// Order requested with nothing selected
    #[error("주문할 상품을 선택해주세요.")]
    EmptySelection,

    /// A required delivery field is blank
    #[error("{0}을(를) 입력해주세요.")]
    MissingDeliveryField(DeliveryField),

    /// `window.open` returned nothing
    #[error("팝업이 차단되었습니다. 팝업 차단을 해제한 후 다시 시도해주세요.")]
    PopupBlocked,

    /// The popup was closed before a result was reported
    #[error("결제가 완료되지 않았습니다.")]
    PopupClosed,

    /// The order has no items to name the payment after
    #[error("주문 상품 정보가 없습니다.")]
    EmptyOrder,

    /// The success redirect lacked `paymentKey`, `orderId` or `amount`
    #[error("결제 정보가 올바르지 않습니다.")]
    InvalidPaymentCallback,

    /// A route was entered without its required data
    #[error("필수 정보가 없어 페이지를 불러올 수 없습니다. ({0})")]
    MissingRouteData(&'static str),

    /// An API call failed
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

/// Errors raised by the payment provider SDK inside the popup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The SDK script could not be loaded or initialised
    #[error("결제 모듈을 불러오지 못했습니다: {0}")]
    SdkLoad(String),

    /// The provider refused to start the hosted payment UI
    #[error("결제를 시작하지 못했습니다: {0}")]
    Initiation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_data_message_wins_for_objects() {
        let cause = FailureCause::Object(json!({"data": {"message": "card declined"}}));
        assert_eq!(cause.user_message(), "card declined");
    }

    #[test]
    fn error_uses_its_own_message() {
        assert_eq!(FailureCause::error("timeout").user_message(), "timeout");
    }

    #[test]
    fn unrecognized_shape_falls_back_to_default() {
        assert_eq!(
            FailureCause::Object(json!({})).user_message(),
            DEFAULT_PAYMENT_ERROR_MESSAGE
        );
        assert_eq!(
            FailureCause::error("  ").user_message(),
            DEFAULT_PAYMENT_ERROR_MESSAGE
        );
    }

    #[test]
    fn top_level_message_used_without_data() {
        let cause = FailureCause::Object(json!({"message": "amount mismatch", "data": {}}));
        assert_eq!(cause.user_message(), "amount mismatch");
    }

    #[test]
    fn rejection_exposes_server_message() {
        let error = ApiError::Rejected {
            status: 400,
            body: json!({"code": "INVALID_AMOUNT", "message": "결제 금액이 일치하지 않습니다."}),
        };
        assert_eq!(error.user_message(), "결제 금액이 일치하지 않습니다.");
        assert_eq!(
            CheckoutError::from(error).to_string(),
            "결제 금액이 일치하지 않습니다."
        );
    }

    #[test]
    fn unauthorized_asks_to_sign_in_again() {
        assert_eq!(
            ApiError::Unauthorized.user_message(),
            "로그인이 만료되었습니다. 다시 로그인해주세요."
        );
    }

    #[test]
    fn transport_errors_keep_their_text() {
        let error = ApiError::Transport("connection refused".to_string());
        assert_eq!(error.user_message(), "Request failed: connection refused");
    }
}
