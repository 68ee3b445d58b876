//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use storefront_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use storefront_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(CheckoutReducer::new())
///     .with_env(checkout_environment())
///     .given_state(awaiting_state)
///     .when_action(CheckoutAction::WindowMessage { event: foreign_event })
///     .then_state(|state| {
///         assert!(matches!(state.phase, CheckoutPhase::AwaitingPayment { .. }));
///         assert!(state.is_loading());
///     })
///     .then_effects(|effects| assertions::assert_no_effects(effects))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce (When)
    ///
    /// Calling this more than once reduces the actions in order. Effect
    /// assertions see only the effects of the last action.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use storefront_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain a `Delay` whose action matches
    ///
    /// # Panics
    ///
    /// Panics if no matching `Delay` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A, F>(effects: &[Effect<A>], matches: F)
    where
        F: Fn(&A) -> bool,
    {
        assert!(
            effects
                .iter()
                .filter_map(Effect::delayed_action)
                .any(matches),
            "Expected a Delay effect with a matching action, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{SmallVec, delay, smallvec};
    use std::collections::BTreeSet;
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct SelectionState {
        selected: BTreeSet<u64>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SelectionAction {
        Select { id: u64, checked: bool },
        Refresh,
    }

    struct SelectionReducer;

    struct SelectionEnv;

    impl Reducer for SelectionReducer {
        type State = SelectionState;
        type Action = SelectionAction;
        type Environment = SelectionEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                SelectionAction::Select { id, checked: true } => {
                    state.selected.insert(id);
                    SmallVec::new()
                },
                SelectionAction::Select { id, checked: false } => {
                    state.selected.remove(&id);
                    SmallVec::new()
                },
                SelectionAction::Refresh => smallvec![delay! {
                    duration: Duration::from_millis(100),
                    action: SelectionAction::Select { id: 0, checked: false }
                }],
            }
        }
    }

    #[test]
    fn test_select_then_unselect() {
        ReducerTest::new(SelectionReducer)
            .with_env(SelectionEnv)
            .given_state(SelectionState::default())
            .when_action(SelectionAction::Select { id: 1, checked: true })
            .when_action(SelectionAction::Select { id: 2, checked: true })
            .when_action(SelectionAction::Select { id: 1, checked: false })
            .then_state(|state| {
                assert_eq!(state.selected.iter().copied().collect::<Vec<_>>(), vec![2]);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_delay_assertion() {
        ReducerTest::new(SelectionReducer)
            .with_env(SelectionEnv)
            .given_state(SelectionState::default())
            .when_action(SelectionAction::Refresh)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_delay_effect(effects, |a| {
                    matches!(a, SelectionAction::Select { checked: false, .. })
                });
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<SelectionAction>(&[Effect::None]);
        assertions::assert_no_effects::<SelectionAction>(&[]);
    }
}
