//! Declarative macros for ergonomic effect construction
//!
//! Most checkout effects are a REST call whose result maps to one feedback
//! action, or a timer that re-enters the reducer. These macros keep those
//! two shapes short.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use storefront_core::async_effect;
///
/// async_effect! {
///     match api.get_order(&order_number).await {
///         Ok(order) => Some(CheckoutAction::OrderLoaded { order }),
///         Err(error) => Some(CheckoutAction::OrderLoadFailed { message: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use storefront_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_millis(500),
///     action: CheckoutAction::PollPopup { attempt: 1 }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        OrderLoaded { order_number: String },
        PollPopup { attempt: u32 },
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::OrderLoaded { order_number: "ORD-1".to_string() })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[tokio::test]
    async fn test_async_effect_macro_resolves_to_action() {
        let Effect::Future(fut) = async_effect!(Some(TestAction::OrderLoaded {
            order_number: "ORD-1".to_string()
        })) else {
            unreachable!("async_effect! always builds Effect::Future");
        };

        assert_eq!(
            fut.await,
            Some(TestAction::OrderLoaded {
                order_number: "ORD-1".to_string()
            })
        );
    }

    #[test]
    fn test_delay_macro() {
        let effect = delay! {
            duration: Duration::from_millis(500),
            action: TestAction::PollPopup { attempt: 1 }
        };

        assert!(matches!(effect, Effect::Delay { .. }));
        assert_eq!(
            effect.delayed_action(),
            Some(&TestAction::PollPopup { attempt: 1 })
        );
    }
}
