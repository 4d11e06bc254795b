//! # SorteoHub Client
//!
//! Client-side core of the SorteoHub raffle marketplace: the stores a UI
//! renders from, the HTTP client they talk through, and the rules that decide
//! which raffle elements a visitor may pick.
//!
//! ## Architecture
//!
//! ```text
//! View ──action──▶ Store ──reduce──▶ (State, Effects)
//!                    ▲                     │
//!                    └──── result action ◀─┘  ApiClient / KeyValueStore / SignalBus
//! ```
//!
//! - [`reconciler`] partitions a raffle's pool into free, sold and reserved
//! - [`selection`] is the visitor's pick-and-submit state machine
//! - [`pool`] generates the element pool for a new raffle
//! - [`wizard`] validates the raffle creation steps
//! - [`auth`], [`raffles`], [`advertiser`] are the long-lived stores
//! - [`api`] is the HTTP client and the ports the stores depend on
//!
//! ## Example
//!
//! ```rust,ignore
//! let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open("session.json")?);
//! let api = Arc::new(ApiClient::new(&ClientConfig::from_env()?, Arc::clone(&storage))?);
//!
//! let auth = AuthStore::new(AuthState::default(), AuthReducer::new(), AuthEnvironment::new(api, storage));
//! auth.send(AuthAction::Restore).await?;
//! ```

pub mod advertiser;
pub mod api;
pub mod auth;
pub mod colors;
pub mod config;
pub mod error;
pub mod pool;
pub mod preferences;
pub mod raffles;
pub mod reconciler;
pub mod selection;
pub mod signals;
pub mod storage;
pub mod types;
pub mod wizard;

pub use api::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ErrorKind};
pub use reconciler::{FilterMode, Partition, partition};
pub use selection::{SelectionAction, SelectionReducer, SelectionState};
pub use signals::{AppSignal, InMemorySignalBus};
pub use storage::FileKeyValueStore;
pub use types::{ElementLabel, Money, Raffle, RaffleId};
