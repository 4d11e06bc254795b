//! # SorteoHub Runtime
//!
//! The [`Store`] that owns a piece of client state and runs its reducer.
//!
//! ## Core Components
//!
//! - **Store**: holds state behind a lock, serializes reducer calls, executes effects
//! - **Feedback loop**: actions produced by effects are sent back into the reducer
//!   and broadcast to observers (views waiting for a result, bridges, tests)
//! - **`EffectHandle`**: lets a caller wait until an action's effects, including
//!   the effects of the actions they fed back, have finished
//!
//! ## Example
//!
//! ```ignore
//! use sorteohub_runtime::Store;
//!
//! let store = Store::new(RaffleStoreState::default(), RaffleReducer::new(), env);
//!
//! store.send(RaffleAction::LoadDetail { id }).await?.wait().await;
//! let raffle = store.state(|s| s.detail.raffle.clone()).await;
//! ```

use sorteohub_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timed out waiting for an action or for effects to settle
        #[error("Timeout waiting for store")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Default number of feedback actions buffered for slow observers
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send`]. Tracking cascades: when an effect produces
/// an action, that action's effects are counted against the same handle, so
/// [`EffectHandle::wait`] returns only once the whole chain has settled.
///
/// A chain that never settles (a polling loop) never completes its handle;
/// use [`EffectHandle::wait_with_timeout`] for those.
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects still running for this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for effects with an upper bound
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: counter shared by a handle and the effects it tracks
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: decrements the tracking counter even if the effect panics
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: decrements the store-wide pending counter on drop
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - the runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicUsize, DEFAULT_BROADCAST_CAPACITY, DecrementGuard, Duration,
        Effect, EffectHandle, EffectTracking, Ordering, PendingGuard, Reducer, RwLock,
        StoreError,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for one reducer
    ///
    /// Cloning a store is cheap and yields another handle to the same state.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// Runs the reducer under the write lock, then starts the returned
        /// effects and returns without waiting for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let (handle, tracking) = EffectHandle::new();
            self.dispatch(action, tracking).await?;
            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes before sending, so a fast effect cannot be missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.selection.count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Number of effects currently running across all handles
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Stop accepting actions and wait for running effects
        ///
        /// Called when the view that owns the store is torn down. Delayed
        /// actions that fire after shutdown are dropped.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// after `timeout`.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Store shutting down");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);
                if pending == 0 {
                    tracing::debug!("All effects completed");
                    return Ok(());
                }
                if start.elapsed() >= timeout {
                    tracing::warn!(pending_effects = pending, "Shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(pending));
                }
                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Whether [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shut_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        async fn dispatch(&self, action: A, tracking: EffectTracking) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!("Rejected action: store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("sorteohub.store.actions.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                let span = tracing::trace_span!("reducer_execution");
                let _enter = span.enter();
                self.reducer.reduce(&mut *state, action, &self.environment)
            };

            tracing::trace!(effects = effects.len(), "Reducer completed");
            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            Ok(())
        }

        /// Spawn one effect, counting it against `tracking`
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking) {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("sorteohub.store.effects", "type" => "future").increment(1);
                    let (guard, pending) = self.track(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending = pending;

                        if let Some(action) = fut.await {
                            store.feed_back(action, &guard.0).await;
                        }
                        drop(guard);
                    });
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("sorteohub.store.effects", "type" => "delay").increment(1);
                    let (guard, pending) = self.track(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending = pending;

                        tokio::time::sleep(duration).await;
                        store.feed_back(*action, &guard.0).await;
                        drop(guard);
                    });
                },
                Effect::Parallel(effects) => {
                    for effect in effects {
                        self.execute_effect(effect, tracking);
                    }
                },
                Effect::Sequential(effects) => {
                    let (guard, pending) = self.track(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending = pending;

                        for effect in effects {
                            let (mut step, step_tracking) = EffectHandle::new();
                            store.execute_effect(effect, &step_tracking);
                            drop(step_tracking);
                            step.wait().await;
                        }
                    });
                },
            }
        }

        fn track(&self, tracking: &EffectTracking) -> (DecrementGuard, PendingGuard) {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            (
                DecrementGuard(tracking.clone()),
                PendingGuard(Arc::clone(&self.pending_effects)),
            )
        }

        /// Broadcast an effect-produced action and reduce it under the same tracking
        async fn feed_back(&self, action: A, tracking: &EffectTracking) {
            let _ = self.action_broadcast.send(action.clone());
            if let Err(error) = self.dispatch(action, tracking.clone()).await {
                tracing::debug!(%error, "Feedback action dropped");
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use sorteohub_core::{SmallVec, async_effect, delay, smallvec};

    #[derive(Debug, Clone, PartialEq)]
    enum LoadAction {
        Load { pages: u32 },
        PageLoaded { remaining: u32 },
        Done,
        Tick,
        Chain,
    }

    #[derive(Debug, Default)]
    struct LoadState {
        pages_seen: u32,
        done: bool,
        ticks: u32,
    }

    struct LoadReducer;

    impl Reducer for LoadReducer {
        type State = LoadState;
        type Action = LoadAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut LoadState,
            action: LoadAction,
            _env: &(),
        ) -> SmallVec<[Effect<LoadAction>; 4]> {
            match action {
                LoadAction::Load { pages } => smallvec![async_effect! {
                    Some(LoadAction::PageLoaded { remaining: pages })
                }],
                LoadAction::PageLoaded { remaining } => {
                    state.pages_seen += 1;
                    if remaining > 1 {
                        smallvec![async_effect! {
                            tokio::time::sleep(Duration::from_millis(2)).await;
                            Some(LoadAction::PageLoaded { remaining: remaining - 1 })
                        }]
                    } else {
                        smallvec![async_effect! { Some(LoadAction::Done) }]
                    }
                },
                LoadAction::Done => {
                    state.done = true;
                    SmallVec::new()
                },
                LoadAction::Tick => {
                    state.ticks += 1;
                    SmallVec::new()
                },
                LoadAction::Chain => smallvec![Effect::chain(vec![
                    delay! {
                        duration: Duration::from_millis(5),
                        action: LoadAction::Tick
                    },
                    async_effect! { Some(LoadAction::Done) },
                ])],
            }
        }
    }

    #[tokio::test]
    async fn wait_covers_feedback_cascade() {
        let store = Store::new(LoadState::default(), LoadReducer, ());

        let mut handle = store.send(LoadAction::Load { pages: 3 }).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

        let (pages, done) = store.state(|s| (s.pages_seen, s.done)).await;
        assert_eq!(pages, 3);
        assert!(done);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn send_and_wait_for_returns_terminal_action() {
        let store = Store::new(LoadState::default(), LoadReducer, ());

        let action = store
            .send_and_wait_for(
                LoadAction::Load { pages: 2 },
                |a| matches!(a, LoadAction::Done),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        assert_eq!(action, LoadAction::Done);
    }

    #[tokio::test]
    async fn sequential_effects_run_in_order() {
        let store = Store::new(LoadState::default(), LoadReducer, ());
        let mut observer = store.subscribe_actions();

        store
            .send(LoadAction::Chain)
            .await
            .unwrap()
            .wait_with_timeout(Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(observer.recv().await.unwrap(), LoadAction::Tick);
        assert_eq!(observer.recv().await.unwrap(), LoadAction::Done);
        assert_eq!(store.state(|s| s.ticks).await, 1);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = Store::new(LoadState::default(), LoadReducer, ());
        store.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(store.is_shut_down());
        let result = store.send(LoadAction::Tick).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn completed_handle_returns_immediately() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }
}
