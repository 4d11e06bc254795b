//! Raffle catalog, organizer lists and CRUD.
//!
//! Every load is tagged with a [`RequestToken`]; a response whose token is
//! no longer current is dropped, so the last load started is the one that
//! lands no matter which response arrives first. Records are replaced
//! wholesale, never patched.
//!
//! Deleting is two-phase: [`RaffleAction::Delete`] only asks for
//! confirmation over the signal bus, and the request is issued once the
//! matching [`AppSignal::ConfirmResolved`] accepts it.

use crate::api::RaffleApi;
use crate::error::ApiError;
use crate::signals::AppSignal;
use crate::types::{Raffle, RaffleFilters, RaffleId, RaffleInput};
use futures::StreamExt;
use sorteohub_core::request::{RequestGeneration, RequestToken};
use sorteohub_core::signal_bus::SignalBus;
use sorteohub_core::{SmallVec, async_effect, effect::Effect, fire_and_forget, reducer::Reducer, smallvec};
use sorteohub_runtime::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Where a list stands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ListStatus {
    /// Never loaded
    #[default]
    Idle,
    /// Load in flight
    Loading,
    /// Loaded with at least one raffle
    Loaded,
    /// Loaded, nothing matched
    Empty,
    /// Load failed
    Failed(ApiError),
}

/// A list of raffles and its load status
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaffleList {
    /// Raffles from the last successful load
    pub raffles: Vec<Raffle>,
    /// Load status
    pub status: ListStatus,
    generation: RequestGeneration,
}

impl RaffleList {
    /// Whether a load is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    fn start(&mut self) -> RequestToken {
        self.status = ListStatus::Loading;
        self.generation.next()
    }

    fn finish(&mut self, request: RequestToken, result: Result<Vec<Raffle>, ApiError>) -> bool {
        if !self.generation.is_current(request) {
            return false;
        }
        match result {
            Ok(raffles) => {
                self.status = if raffles.is_empty() {
                    ListStatus::Empty
                } else {
                    ListStatus::Loaded
                };
                self.raffles = raffles;
            },
            // keep the previous snapshot visible under the error banner
            Err(error) => self.status = ListStatus::Failed(error),
        }
        true
    }

    /// Put a new record on top; a load started earlier would not include it
    fn prepend(&mut self, raffle: Raffle) {
        self.generation.invalidate();
        self.raffles.insert(0, raffle);
        self.status = ListStatus::Loaded;
    }

    fn replace(&mut self, raffle: &Raffle) {
        if let Some(slot) = self.raffles.iter_mut().find(|r| r.id == raffle.id) {
            *slot = raffle.clone();
        }
    }

    fn remove(&mut self, id: &RaffleId) {
        self.raffles.retain(|r| &r.id != id);
        if self.raffles.is_empty() && self.status == ListStatus::Loaded {
            self.status = ListStatus::Empty;
        }
    }
}

/// The raffle shown on the detail view
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaffleDetail {
    /// Current record
    pub raffle: Option<Raffle>,
    /// Load in flight
    pub loading: bool,
    /// Last load failure
    pub error: Option<ApiError>,
    generation: RequestGeneration,
}

/// Outcome of the last create/update/delete
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MutationState {
    /// Nothing attempted
    #[default]
    Idle,
    /// Waiting for the user to confirm a delete
    AwaitingConfirmation(RaffleId),
    /// Request in flight
    Saving,
    /// Raffle created
    Created(RaffleId),
    /// Raffle updated
    Updated(RaffleId),
    /// Raffle deleted
    Deleted(RaffleId),
    /// Delete was declined in the dialog
    Cancelled(RaffleId),
    /// Request failed; shown inline next to the form
    Failed(ApiError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingDelete {
    confirm_id: u64,
    raffle_id: RaffleId,
}

/// Raffle store state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaffleStoreState {
    /// Public listing
    pub list: RaffleList,
    /// The organizer's own raffles
    pub mine: RaffleList,
    /// Detail view
    pub detail: RaffleDetail,
    /// Last mutation
    pub mutation: MutationState,
    pending_delete: Option<PendingDelete>,
    next_confirm_id: u64,
}

/// Raffle store actions
#[derive(Clone, Debug, PartialEq)]
pub enum RaffleAction {
    /// Load the public listing
    LoadList {
        /// Filters to apply
        filters: RaffleFilters,
    },
    /// Listing response
    ListLoaded {
        /// Request this answers
        request: RequestToken,
        /// Raffles or failure
        result: Result<Vec<Raffle>, ApiError>,
    },
    /// Load the organizer's raffles
    LoadMine,
    /// Organizer list response
    MineLoaded {
        /// Request this answers
        request: RequestToken,
        /// Raffles or failure
        result: Result<Vec<Raffle>, ApiError>,
    },
    /// Load one raffle
    LoadDetail {
        /// Raffle to load
        id: RaffleId,
    },
    /// Detail response
    DetailLoaded {
        /// Request this answers
        request: RequestToken,
        /// Raffle or failure
        result: Result<Raffle, ApiError>,
    },
    /// Create a raffle
    Create {
        /// Validated wizard output
        input: RaffleInput,
    },
    /// Update a raffle
    Update {
        /// Raffle to update
        id: RaffleId,
        /// New values
        input: RaffleInput,
    },
    /// Create succeeded
    Created {
        /// Stored record
        raffle: Raffle,
    },
    /// Update succeeded
    Updated {
        /// Stored record
        raffle: Raffle,
    },
    /// Ask to delete a raffle (requires confirmation)
    Delete {
        /// Raffle to delete
        id: RaffleId,
    },
    /// Answer to a confirmation dialog
    ConfirmResolved {
        /// Dialog being answered
        confirm_id: u64,
        /// Whether the user accepted
        accepted: bool,
    },
    /// Delete succeeded
    Deleted {
        /// Deleted raffle
        id: RaffleId,
    },
    /// Create, update or delete failed
    MutationFailed {
        /// Why
        error: ApiError,
    },
}

/// Dependencies of the raffle store
#[derive(Clone)]
pub struct RaffleEnvironment {
    /// Backend
    pub api: Arc<dyn RaffleApi>,
    /// Confirmation dialogs
    pub signals: Arc<dyn SignalBus<AppSignal>>,
}

impl RaffleEnvironment {
    /// Bundle dependencies
    #[must_use]
    pub fn new(api: Arc<dyn RaffleApi>, signals: Arc<dyn SignalBus<AppSignal>>) -> Self {
        Self { api, signals }
    }
}

/// Raffle store
pub type RaffleStore = Store<RaffleStoreState, RaffleAction, RaffleEnvironment, RaffleReducer>;

/// Reducer for [`RaffleStoreState`]
#[derive(Clone, Debug, Default)]
pub struct RaffleReducer;

impl RaffleReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for RaffleReducer {
    type State = RaffleStoreState;
    type Action = RaffleAction;
    type Environment = RaffleEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut RaffleStoreState,
        action: RaffleAction,
        env: &RaffleEnvironment,
    ) -> SmallVec<[Effect<RaffleAction>; 4]> {
        match action {
            // ========== Loads ==========
            RaffleAction::LoadList { filters } => {
                let request = state.list.start();
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    let result = api.list_raffles(&filters).await;
                    Some(RaffleAction::ListLoaded { request, result })
                }]
            },

            RaffleAction::ListLoaded { request, result } => {
                if !state.list.finish(request, result) {
                    tracing::debug!(request = request.value(), "Dropping stale raffle listing");
                }
                SmallVec::new()
            },

            RaffleAction::LoadMine => {
                let request = state.mine.start();
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    let result = api.my_raffles().await;
                    Some(RaffleAction::MineLoaded { request, result })
                }]
            },

            RaffleAction::MineLoaded { request, result } => {
                if !state.mine.finish(request, result) {
                    tracing::debug!(request = request.value(), "Dropping stale organizer listing");
                }
                SmallVec::new()
            },

            RaffleAction::LoadDetail { id } => {
                state.detail.loading = true;
                state.detail.error = None;
                let request = state.detail.generation.next();
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    let result = api.get_raffle(&id).await;
                    Some(RaffleAction::DetailLoaded { request, result })
                }]
            },

            RaffleAction::DetailLoaded { request, result } => {
                if !state.detail.generation.is_current(request) {
                    tracing::debug!(request = request.value(), "Dropping stale raffle detail");
                    return SmallVec::new();
                }
                state.detail.loading = false;
                match result {
                    Ok(raffle) => {
                        state.detail.raffle = Some(raffle);
                        state.detail.error = None;
                    },
                    Err(error) => {
                        tracing::warn!(%error, "Raffle detail failed to load");
                        state.detail.raffle = None;
                        state.detail.error = Some(error);
                    },
                }
                SmallVec::new()
            },

            // ========== Create / update ==========
            RaffleAction::Create { input } => {
                state.mutation = MutationState::Saving;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.create_raffle(&input).await {
                        Ok(raffle) => Some(RaffleAction::Created { raffle }),
                        Err(error) => Some(RaffleAction::MutationFailed { error }),
                    }
                }]
            },

            RaffleAction::Update { id, input } => {
                state.mutation = MutationState::Saving;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.update_raffle(&id, &input).await {
                        Ok(raffle) => Some(RaffleAction::Updated { raffle }),
                        Err(error) => Some(RaffleAction::MutationFailed { error }),
                    }
                }]
            },

            RaffleAction::Created { raffle } => {
                tracing::info!(raffle_id = %raffle.id, "Raffle created");
                state.mutation = MutationState::Created(raffle.id.clone());
                state.mine.prepend(raffle);
                SmallVec::new()
            },

            RaffleAction::Updated { raffle } => {
                tracing::info!(raffle_id = %raffle.id, "Raffle updated");
                state.mutation = MutationState::Updated(raffle.id.clone());
                state.list.replace(&raffle);
                state.mine.replace(&raffle);
                if state.detail.raffle.as_ref().is_some_and(|r| r.id == raffle.id) {
                    state.detail.raffle = Some(raffle);
                }
                SmallVec::new()
            },

            // ========== Delete ==========
            RaffleAction::Delete { id } => {
                state.next_confirm_id += 1;
                let confirm_id = state.next_confirm_id;
                state.pending_delete = Some(PendingDelete {
                    confirm_id,
                    raffle_id: id.clone(),
                });
                state.mutation = MutationState::AwaitingConfirmation(id);

                let signals = Arc::clone(&env.signals);
                smallvec![fire_and_forget! {
                    let signal = AppSignal::ConfirmRequested {
                        id: confirm_id,
                        message: "¿Seguro que deseas eliminar esta rifa? Esta acción no se puede deshacer.".to_string(),
                    };
                    if let Err(error) = signals.publish(signal) {
                        tracing::warn!(%error, "Could not request delete confirmation");
                    }
                }]
            },

            RaffleAction::ConfirmResolved {
                confirm_id,
                accepted,
            } => {
                let Some(pending) = state
                    .pending_delete
                    .take_if(|pending| pending.confirm_id == confirm_id)
                else {
                    return SmallVec::new();
                };

                if !accepted {
                    state.mutation = MutationState::Cancelled(pending.raffle_id);
                    return SmallVec::new();
                }

                state.mutation = MutationState::Saving;
                let api = Arc::clone(&env.api);
                let id = pending.raffle_id;
                smallvec![async_effect! {
                    match api.delete_raffle(&id).await {
                        Ok(()) => Some(RaffleAction::Deleted { id }),
                        Err(error) => Some(RaffleAction::MutationFailed { error }),
                    }
                }]
            },

            RaffleAction::Deleted { id } => {
                tracing::info!(raffle_id = %id, "Raffle deleted");
                state.list.remove(&id);
                state.mine.remove(&id);
                if state.detail.raffle.as_ref().is_some_and(|r| r.id == id) {
                    state.detail.raffle = None;
                }
                state.mutation = MutationState::Deleted(id);
                SmallVec::new()
            },

            RaffleAction::MutationFailed { error } => {
                tracing::warn!(%error, "Raffle mutation failed");
                state.mutation = MutationState::Failed(error);
                SmallVec::new()
            },
        }
    }
}

/// Forward dialog answers from the signal bus into the raffle store
///
/// Subscribes before returning, so an answer published right after this
/// call is not missed. The task ends when the bus closes.
pub fn spawn_confirmation_bridge(
    store: RaffleStore,
    signals: &dyn SignalBus<AppSignal>,
) -> JoinHandle<()> {
    let mut stream = signals.subscribe();
    tokio::spawn(async move {
        while let Some(signal) = stream.next().await {
            let AppSignal::ConfirmResolved { id, accepted } = signal else {
                continue;
            };
            let action = RaffleAction::ConfirmResolved {
                confirm_id: id,
                accepted,
            };
            if let Err(error) = store.send(action).await {
                tracing::debug!(%error, "Raffle store gone, stopping confirmation bridge");
                break;
            }
        }
    })
}
