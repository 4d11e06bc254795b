//! In-process signal bus.
//!
//! Some client components must react to things that happen in unrelated
//! stores: the navigation bar re-reads the advertiser session after a login
//! performed on another page, and a delete button waits for the user to
//! answer a confirmation dialog rendered elsewhere. Instead of a
//! process-wide event target, those components share a [`SignalBus`]
//! injected through their environments.
//!
//! ```text
//! ┌──────────────┐  publish   ┌───────────┐  subscribe  ┌──────────────┐
//! │ Advertiser   │──────────► │ SignalBus │ ──────────► │ Navigation   │
//! │ store        │            │           │             │ / dialogs    │
//! └──────────────┘            └───────────┘             └──────────────┘
//! ```
//!
//! Delivery is best-effort and in-process: a subscriber that falls behind
//! skips old signals, and signals published with no subscriber are dropped.

use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur on the signal bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalBusError {
    /// The bus has been shut down
    #[error("Signal bus closed")]
    Closed,
}

/// Stream of signals delivered to one subscriber.
pub type SignalStream<S> = Pin<Box<dyn Stream<Item = S> + Send>>;

/// Publish/subscribe channel for in-process signals of type `S`.
///
/// # Dyn Compatibility
///
/// Used as `Arc<dyn SignalBus<AppSignal>>` inside reducer environments, so
/// methods are synchronous and the subscription is a boxed stream.
pub trait SignalBus<S>: Send + Sync {
    /// Publish a signal to every current subscriber.
    ///
    /// Returns the number of subscribers that received it (zero is not an
    /// error).
    ///
    /// # Errors
    ///
    /// Returns [`SignalBusError::Closed`] if the bus can no longer deliver.
    fn publish(&self, signal: S) -> Result<usize, SignalBusError>;

    /// Subscribe to all signals published after this call.
    fn subscribe(&self) -> SignalStream<S>;
}
