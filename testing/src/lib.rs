//! # SorteoHub Testing
//!
//! Testing utilities for the SorteoHub client stores.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - Deterministic environment pieces ([`FixedClock`], [`InMemoryKeyValueStore`],
//!   [`RecordingSignalBus`])
//! - proptest strategies for element pools
//!
//! ## Example
//!
//! ```ignore
//! use sorteohub_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(SelectionReducer)
//!     .with_env(())
//!     .given_state(SelectionState::new(partition, Money::from_units(50)))
//!     .when_action(SelectionAction::Toggle { label: 10.into() })
//!     .then_state(|s| assert_eq!(s.count(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use sorteohub_core::environment::Clock;
use std::sync::{Arc, RwLock};

/// Ergonomic testing utilities for reducers
pub mod reducer_test;

/// In-memory storage and signal bus doubles
pub mod storage_mocks;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, RwLock, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same instant until explicitly advanced.
    ///
    /// ```
    /// use sorteohub_testing::mocks::FixedClock;
    /// use sorteohub_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::days(1));
    /// assert_eq!(clock.now() - before, Duration::days(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward
        #[allow(clippy::unwrap_used)] // Lock poison only follows a panicking test
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap();
            *time += by;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)] // Lock poison only follows a panicking test
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing strategies
pub mod properties {
    use proptest::prelude::*;

    /// Strategy for a numeric pool size and disjoint sold/reserved picks
    ///
    /// Yields `(pool_size, sold, reserved)` where `sold` and `reserved` are
    /// disjoint sets of integers within `1..=pool_size`.
    pub fn numeric_pool_with_disjoint_picks() -> impl Strategy<Value = (i64, Vec<i64>, Vec<i64>)> {
        (1_i64..300).prop_flat_map(|size| {
            proptest::collection::vec(0_u8..3, usize::try_from(size).unwrap_or(0)).prop_map(
                move |marks| {
                    let mut sold = Vec::new();
                    let mut reserved = Vec::new();
                    for (n, mark) in (1..=size).zip(marks) {
                        match mark {
                            1 => sold.push(n),
                            2 => reserved.push(n),
                            _ => {},
                        }
                    }
                    (size, sold, reserved)
                },
            )
        })
    }

    /// Strategy for free-form text labels (non-numeric pools)
    pub fn text_labels() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-zA-Z]{1,8}", 0..40)
            .prop_map(|set| set.into_iter().collect())
    }
}

/// Initialize a compact tracing subscriber for tests (idempotent)
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use storage_mocks::{InMemoryKeyValueStore, RecordingSignalBus};
