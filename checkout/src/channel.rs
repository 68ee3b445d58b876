//! Cross-window confirmation channel
//!
//! The payment popup reports its outcome to the opener with a single
//! `postMessage`. The payload is a closed union, [`PaymentMessage`]; anything
//! else arriving on the opener's `message` listener is not a payment result.
//!
//! [`message_channel`] is the in-process stand-in for `postMessage`: the popup
//! side gets a [`WindowMessenger`], the opener side a [`MessageInbox`].
//! Delivery is fire-and-forget. The sender learns nothing about whether the
//! message was received.

use crate::routes::Origin;
use crate::types::OrderNumber;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Payment outcome posted from the popup to the opener
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMessage {
    /// `{type: "PAYMENT_SUCCESS", orderId}`
    PaymentSuccess {
        /// Confirmed order
        #[serde(rename = "orderId")]
        order_id: OrderNumber,
    },
    /// `{type: "PAYMENT_FAIL", message, code?}`
    PaymentFail {
        /// Message for the opener's error dialog
        message: String,
        /// Provider error code, present on the fail-route path
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

/// A `message` event as the opener's listener receives it
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    /// Origin of the window that posted the message
    pub origin: Origin,
    /// Structured-cloned payload, not yet trusted
    pub data: Value,
}

impl MessageEvent {
    /// Decodes the payload as a payment result
    ///
    /// # Errors
    ///
    /// Returns the decode error when the payload is not a [`PaymentMessage`].
    pub fn payment_message(&self) -> Result<PaymentMessage, serde_json::Error> {
        PaymentMessage::deserialize(&self.data)
    }
}

/// `window.opener.postMessage` as seen from the popup
pub trait WindowMessenger: Send + Sync {
    /// Post `message` to the opener, delivered only if the opener's origin
    /// equals `target_origin`
    fn post_message(&self, message: &PaymentMessage, target_origin: &Origin);
}

/// Opener-side end of a [`message_channel`]
#[derive(Debug)]
pub struct MessageInbox {
    receiver: mpsc::UnboundedReceiver<MessageEvent>,
}

impl MessageInbox {
    /// Next event, `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<MessageEvent> {
        self.receiver.recv().await
    }
}

/// Popup-side end of a [`message_channel`]
#[derive(Clone, Debug)]
pub struct OpenerPort {
    opener_origin: Origin,
    sender_origin: Origin,
    sender: mpsc::UnboundedSender<MessageEvent>,
}

impl OpenerPort {
    /// Posts a raw payload, bypassing the [`PaymentMessage`] union
    ///
    /// Models scripts that post arbitrary data to the opener.
    pub fn post_raw(&self, data: Value, target_origin: &Origin) {
        if *target_origin != self.opener_origin {
            tracing::debug!(
                target = %target_origin,
                opener = %self.opener_origin,
                "Message dropped: target origin does not match opener"
            );
            return;
        }

        let event = MessageEvent {
            origin: self.sender_origin.clone(),
            data,
        };
        if self.sender.send(event).is_err() {
            tracing::debug!("Message dropped: opener is gone");
        }
    }
}

impl WindowMessenger for OpenerPort {
    fn post_message(&self, message: &PaymentMessage, target_origin: &Origin) {
        match serde_json::to_value(message) {
            Ok(data) => self.post_raw(data, target_origin),
            Err(error) => tracing::error!(%error, "Failed to encode payment message"),
        }
    }
}

/// Creates a message channel from a popup at `sender_origin` to an opener at
/// `opener_origin`
///
/// Every delivered event carries `sender_origin`, the way the browser stamps
/// `event.origin`.
#[must_use]
pub fn message_channel(opener_origin: Origin, sender_origin: Origin) -> (OpenerPort, MessageInbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        OpenerPort {
            opener_origin,
            sender_origin,
            sender,
        },
        MessageInbox { receiver },
    )
}
