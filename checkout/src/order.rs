//! Order draft creation requests

use crate::error::CheckoutError;
use crate::types::{CartLine, OptionSnapshot, ProductId};
use serde::{Deserialize, Serialize};

/// One line of `POST /orders`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    /// Product to order
    pub product_id: ProductId,
    /// Quantity
    pub quantity: u32,
    /// Resolved option
    pub option_snapshot: OptionSnapshot,
}

impl OrderLineRequest {
    /// Builds the order line for a cart line
    ///
    /// There is no per-line option picker yet: a line without a chosen color
    /// is ordered in the product's first available color, and a product
    /// without colors is ordered without one.
    #[must_use]
    pub fn from_cart_line(line: &CartLine) -> Self {
        let color = line
            .option
            .color
            .clone()
            .or_else(|| line.product.colors.first().cloned());

        Self {
            product_id: line.product.id,
            quantity: line.quantity,
            option_snapshot: OptionSnapshot { color },
        }
    }
}

/// Body of `POST /orders`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Lines to order, never empty
    pub products: Vec<OrderLineRequest>,
}

impl CreateOrderRequest {
    /// Builds the request for the selected cart lines
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptySelection`] when no line is given.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a CartLine>) -> Result<Self, CheckoutError> {
        let products: Vec<_> = lines.into_iter().map(OrderLineRequest::from_cart_line).collect();

        if products.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        Ok(Self { products })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CartLineId, Money, ProductSummary};
    use serde_json::json;

    fn line(colors: &[&str], chosen: Option<&str>) -> CartLine {
        CartLine {
            id: CartLineId::new(1),
            cart_id: 1,
            product: ProductSummary {
                id: ProductId::new(10),
                name: "셔츠".to_string(),
                price: Money::from_won(1_000),
                stock: 3,
                colors: colors.iter().map(ToString::to_string).collect(),
            },
            quantity: 2,
            option: OptionSnapshot {
                color: chosen.map(ToString::to_string),
            },
        }
    }

    #[test]
    fn explicit_color_is_kept() {
        let request = OrderLineRequest::from_cart_line(&line(&["RED", "BLUE"], Some("BLUE")));
        assert_eq!(request.option_snapshot, OptionSnapshot::color("BLUE"));
    }

    #[test]
    fn first_available_color_is_the_fallback() {
        let request = OrderLineRequest::from_cart_line(&line(&["RED", "BLUE"], None));
        assert_eq!(request.option_snapshot, OptionSnapshot::color("RED"));
    }

    #[test]
    fn no_colors_means_no_color() {
        let request = OrderLineRequest::from_cart_line(&line(&[], None));
        assert_eq!(request.option_snapshot, OptionSnapshot::default());
    }

    #[test]
    fn empty_selection_is_rejected() {
        assert_eq!(
            CreateOrderRequest::from_lines(std::iter::empty()),
            Err(CheckoutError::EmptySelection)
        );
    }

    #[test]
    fn request_body_shape() {
        let lines = [line(&["RED"], None)];
        let request = CreateOrderRequest::from_lines(&lines).unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"products": [{"productId": 10, "quantity": 2, "optionSnapshot": {"color": "RED"}}]})
        );
    }
}
