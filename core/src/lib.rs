//! # SorteoHub Core
//!
//! Core traits and types shared by the SorteoHub client stores.
//!
//! Every piece of client state (the signed-in session, the raffle catalog,
//! a visitor's element selection, the advertiser session) is owned by a
//! reducer and mutated only through actions:
//!
//! - **State**: plain owned data the views render
//! - **Action**: user intents and the results fed back by effects
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of I/O to perform (HTTP call, storage write, timer)
//! - **Environment**: injected dependencies (`Clock`, `KeyValueStore`, API ports)
//!
//! Reducers never perform I/O themselves, which keeps the availability and
//! selection rules testable without a network or a browser.
//!
//! ## Example
//!
//! ```ignore
//! use sorteohub_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         state.count += 1;
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Effect construction macros
pub mod effect_macros;

/// In-process signal bus used to bridge decoupled stores
pub mod signal_bus;

/// Reducer module - the trait every store's business logic implements
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer owns
    /// - `Action`: The inputs it processes (intents and effect results)
    /// - `Environment`: The injected dependencies it needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns descriptions of the I/O to run.
        /// Must not block and must not perform I/O directly.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed by the store
    ///
    /// Effects are values. The runtime executes them and feeds any resulting
    /// action back into the reducer.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another
        Sequential(Vec<Effect<Action>>),

        /// Dispatch an action after a delay (polling ticks, debounces)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// If the future resolves to `Some(action)` the action is fed back
        /// into the reducer.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns true for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits
///
/// Everything a reducer would otherwise reach for as a global (the wall
/// clock, browser local storage) is abstracted here and injected.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time for deterministic tests
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock implementation
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Persistent string key-value storage (the local-storage seam)
    ///
    /// Implementations must be cheap to call from reducers: `get` is used
    /// synchronously while restoring a session. Writes are issued from effects.
    pub trait KeyValueStore: Send + Sync {
        /// Read a value
        fn get(&self, key: &str) -> Option<String>;

        /// Write a value, replacing any previous one
        fn set(&self, key: &str, value: &str);

        /// Delete a value (no-op when absent)
        fn remove(&self, key: &str);
    }
}

/// Request generations - guards against out-of-order responses
///
/// A store issues a new [`RequestToken`] for every load it starts and only
/// accepts the result carrying the most recent token. A slow response for an
/// earlier request can therefore never overwrite a newer one.
pub mod request {
    use serde::{Deserialize, Serialize};

    /// Token identifying one in-flight load
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RequestToken(u64);

    impl RequestToken {
        /// Raw generation number
        #[must_use]
        pub const fn value(self) -> u64 {
            self.0
        }
    }

    /// Monotonic generation counter owned by a piece of state
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RequestGeneration {
        current: u64,
    }

    impl RequestGeneration {
        /// Start a new request, invalidating every earlier token
        pub const fn next(&mut self) -> RequestToken {
            self.current += 1;
            RequestToken(self.current)
        }

        /// Invalidate outstanding tokens without starting a request
        pub const fn invalidate(&mut self) {
            self.current += 1;
        }

        /// Whether `token` belongs to the latest request
        #[must_use]
        pub const fn is_current(&self, token: RequestToken) -> bool {
            token.0 == self.current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};
    use super::request::RequestGeneration;

    #[test]
    fn latest_token_wins() {
        let mut generation = RequestGeneration::default();
        let first = generation.next();
        let second = generation.next();

        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert!(second.value() > first.value());
    }

    #[test]
    fn invalidate_rejects_outstanding_token() {
        let mut generation = RequestGeneration::default();
        let token = generation.next();
        generation.invalidate();
        assert!(!generation.is_current(token));
    }

    #[test]
    fn effect_debug_hides_future() {
        let effect: Effect<u8> = Effect::Future(Box::pin(async { Some(1) }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
        assert!(Effect::<u8>::None.is_none());
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
