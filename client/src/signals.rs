//! Signals shared between otherwise unrelated client components.

use async_stream::stream;
use serde::{Deserialize, Serialize};
use sorteohub_core::signal_bus::{SignalBus, SignalBusError, SignalStream};
use tokio::sync::broadcast;

/// Application-wide signal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppSignal {
    /// Advertiser logged in or out; navigation should re-read the session
    AdvertiserAuthChanged {
        /// Whether an advertiser session now exists
        logged_in: bool,
    },
    /// A component asks the user to confirm a destructive action
    ConfirmRequested {
        /// Correlates the answer with the request
        id: u64,
        /// Question shown in the dialog
        message: String,
    },
    /// The user answered a confirmation dialog
    ConfirmResolved {
        /// Request being answered
        id: u64,
        /// Whether the user accepted
        accepted: bool,
    },
}

/// Default per-subscriber backlog
const DEFAULT_CAPACITY: usize = 64;

/// Signal bus over a tokio broadcast channel
///
/// Cloning shares the channel.
#[derive(Clone, Debug)]
pub struct InMemorySignalBus<S> {
    sender: broadcast::Sender<S>,
}

impl<S: Clone + Send + 'static> InMemorySignalBus<S> {
    /// Create a bus with the default backlog
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus keeping up to `capacity` undelivered signals per subscriber
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl<S: Clone + Send + 'static> Default for InMemorySignalBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync + 'static> SignalBus<S> for InMemorySignalBus<S> {
    fn publish(&self, signal: S) -> Result<usize, SignalBusError> {
        // send only fails when nobody is subscribed
        Ok(self.sender.send(signal).unwrap_or(0))
    }

    fn subscribe(&self) -> SignalStream<S> {
        let mut rx = self.sender.subscribe();
        Box::pin(stream! {
            loop {
                match rx.recv().await {
                    Ok(signal) => yield signal,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Signal subscriber lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn every_subscriber_receives_signals() {
        let bus = InMemorySignalBus::<AppSignal>::new();
        let mut nav = bus.subscribe();
        let mut dialog = bus.subscribe();

        let delivered = bus
            .publish(AppSignal::AdvertiserAuthChanged { logged_in: true })
            .unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(
            nav.next().await,
            Some(AppSignal::AdvertiserAuthChanged { logged_in: true })
        );
        assert_eq!(
            dialog.next().await,
            Some(AppSignal::AdvertiserAuthChanged { logged_in: true })
        );
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_signals() {
        let bus = InMemorySignalBus::<AppSignal>::new();
        assert_eq!(
            bus.publish(AppSignal::ConfirmResolved { id: 1, accepted: true }).unwrap(),
            0
        );

        let mut late = bus.subscribe();
        bus.publish(AppSignal::ConfirmResolved { id: 2, accepted: false })
            .unwrap();
        assert_eq!(
            late.next().await,
            Some(AppSignal::ConfirmResolved { id: 2, accepted: false })
        );
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let bus = InMemorySignalBus::<u32>::with_capacity(2);
        let mut slow = bus.subscribe();
        for n in 0..5 {
            bus.publish(n).unwrap();
        }
        assert_eq!(slow.next().await, Some(3));
        assert_eq!(slow.next().await, Some(4));
    }
}
