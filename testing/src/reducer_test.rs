//! Given-When-Then harness for reducers.
//!
//! Reducers are pure, so most store behavior (selection rules, stale-response
//! handling, session flags) is tested by running the reducer directly and
//! inspecting state and the returned effects, without spawning anything.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use sorteohub_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers
///
/// Actions given with [`ReducerTest::when_actions`] are applied in order;
/// effect assertions see the effects of the last action only.
///
/// ```ignore
/// ReducerTest::new(RaffleReducer::new())
///     .with_env(env)
///     .given_state(RaffleStoreState::default())
///     .when_action(RaffleAction::LoadList { filters: RaffleFilters::default() })
///     .then_state(|s| assert!(s.list.is_loading()))
///     .then_effects(assertions::assert_has_future_effect)
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

    /// Add an action to apply (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions to apply in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
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

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test, execute all assertions and return the final state
    ///
    /// # Panics
    ///
    /// Panics if initial state, an action, or environment is not set,
    /// or if any assertion fails.
    #[allow(clippy::expect_used)] // Test harness reports misuse by panicking
    pub fn run(self) -> S {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

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

        state
    }
}

/// Helper assertions for effects
pub mod assertions {
    use sorteohub_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
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
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects schedule a delayed action
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Delay { .. })),
            "Expected at least one Delay effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use sorteohub_core::{SmallVec, smallvec};
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct CartState {
        items: Vec<u32>,
    }

    #[derive(Clone, Debug)]
    enum CartAction {
        Add(u32),
        Remind,
    }

    struct CartReducer;

    impl Reducer for CartReducer {
        type State = CartState;
        type Action = CartAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut CartState,
            action: CartAction,
            _env: &(),
        ) -> SmallVec<[Effect<CartAction>; 4]> {
            match action {
                CartAction::Add(item) => {
                    state.items.push(item);
                    SmallVec::new()
                },
                CartAction::Remind => smallvec![Effect::Delay {
                    duration: Duration::from_secs(1),
                    action: Box::new(CartAction::Remind),
                }],
            }
        }
    }

    #[test]
    fn applies_actions_in_order() {
        let state = ReducerTest::new(CartReducer)
            .with_env(())
            .given_state(CartState { items: vec![] })
            .when_actions([CartAction::Add(3), CartAction::Add(1)])
            .then_state(|s| assert_eq!(s.items, vec![3, 1]))
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(state.items.len(), 2);
    }

    #[test]
    fn effect_assertions_see_last_action() {
        ReducerTest::new(CartReducer)
            .with_env(())
            .given_state(CartState { items: vec![] })
            .when_action(CartAction::Add(1))
            .when_action(CartAction::Remind)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_delay_effect(effects);
            })
            .run();
    }
}
