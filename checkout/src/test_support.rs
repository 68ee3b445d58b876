//! Fixtures and effect runners shared by the unit tests

use crate::routes::Origin;
use crate::types::{
    CartLine, CartLineId, Money, OptionSnapshot, OrderDraft, OrderItem, OrderNumber, OrderStatus,
    ProductId, ProductSummary,
};
use futures::future::BoxFuture;
use storefront_core::SmallVec;
use storefront_core::effect::Effect;

pub const APP_ORIGIN: &str = "http://localhost:3000";

#[allow(clippy::unwrap_used)]
pub fn app_origin() -> Origin {
    Origin::parse(APP_ORIGIN).unwrap()
}

/// Cart line `id` for product `id` named `상품{id}` in colors RED and BLUE
pub fn cart_line(id: u64, price: i64, quantity: u32) -> CartLine {
    CartLine {
        id: CartLineId::new(id),
        cart_id: 1,
        product: ProductSummary {
            id: ProductId::new(id),
            name: format!("상품{id}"),
            price: Money::from_won(price),
            stock: 10,
            colors: vec!["RED".to_string(), "BLUE".to_string()],
        },
        quantity,
        option: OptionSnapshot::default(),
    }
}

/// Unpaid order `number` with one item per `(name, price, quantity)`
pub fn order_draft(number: &str, items: &[(&str, i64, u32)]) -> OrderDraft {
    let items: Vec<OrderItem> = items
        .iter()
        .enumerate()
        .map(|(index, (name, price, quantity))| OrderItem {
            product_id: ProductId::new(index as u64 + 1),
            product_name: (*name).to_string(),
            price: Money::from_won(*price),
            quantity: *quantity,
            option_snapshot: OptionSnapshot::default(),
        })
        .collect();

    OrderDraft {
        id: 1,
        order_number: OrderNumber::new(number),
        total_price: items.iter().map(|item| item.price.times(item.quantity)).sum(),
        items,
        status: OrderStatus::Ordered,
        delivery: None,
        member: None,
        ordered_at: None,
    }
}

/// Runs an effect to completion and collects the actions it feeds back
///
/// Delays are not waited for: their action is returned immediately.
pub fn resolve<A: Send + 'static>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
    Box::pin(async move {
        match effect {
            Effect::None => Vec::new(),
            Effect::Future(fut) => fut.await.into_iter().collect(),
            Effect::Delay { action, .. } => vec![*action],
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                let mut actions = Vec::new();
                for effect in effects {
                    actions.extend(resolve(effect).await);
                }
                actions
            },
        }
    })
}

/// [`resolve`] for everything a reducer returned
pub async fn resolve_all<A: Send + 'static>(effects: SmallVec<[Effect<A>; 4]>) -> Vec<A> {
    let mut actions = Vec::new();
    for effect in effects {
        actions.extend(resolve(effect).await);
    }
    actions
}
