//! Advertiser session.
//!
//! While started, the store checks the stored advertiser token against
//! `/advertisers/me` once per poll interval. There is no retry: a failed
//! check clears the cached profile and the next tick tries again. Every
//! `Start`, `Stop` and `Logout` bumps the tick counter, so timers and checks
//! issued by an earlier run land as stale and are dropped.

use crate::api::AdvertiserApi;
use crate::error::ApiError;
use crate::signals::AppSignal;
use crate::storage::keys;
use crate::types::{AdvertiserProfile, AdvertiserSession, Credentials};
use sorteohub_core::environment::KeyValueStore;
use sorteohub_core::signal_bus::SignalBus;
use sorteohub_core::{SmallVec, async_effect, delay, effect::Effect, fire_and_forget, reducer::Reducer, smallvec};
use sorteohub_runtime::Store;
use std::sync::Arc;
use std::time::Duration;

/// Advertiser session state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvertiserState {
    /// Profile from the last successful check
    pub profile: Option<AdvertiserProfile>,
    /// Whether the poller is running
    pub polling: bool,
    /// Current poll run; older ticks are ignored
    pub tick: u64,
    /// Login in flight
    pub logging_in: bool,
    /// Last login failure
    pub login_error: Option<ApiError>,
}

impl AdvertiserState {
    /// Whether an advertiser profile is cached
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.profile.is_some()
    }
}

/// Advertiser session actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvertiserAction {
    /// Check now and then once per interval
    Start,
    /// Scheduled check
    Poll {
        /// Run this timer belongs to
        tick: u64,
    },
    /// Check succeeded
    ProfileLoaded {
        /// Run that issued the check
        tick: u64,
        /// Current profile
        profile: AdvertiserProfile,
    },
    /// Check failed
    PollFailed {
        /// Run that issued the check
        tick: u64,
        /// Why
        error: ApiError,
    },
    /// Stop polling (view torn down)
    Stop,
    /// Log in as an advertiser
    Login {
        /// Email and password
        credentials: Credentials,
    },
    /// Login succeeded
    LoggedIn {
        /// Token and profile
        session: AdvertiserSession,
    },
    /// Login failed
    LoginFailed {
        /// Why
        error: ApiError,
    },
    /// Drop the advertiser session
    Logout,
}

/// Dependencies of the advertiser store
#[derive(Clone)]
pub struct AdvertiserEnvironment {
    /// Backend
    pub api: Arc<dyn AdvertiserApi>,
    /// Holds `advertiserToken`
    pub storage: Arc<dyn KeyValueStore>,
    /// Receives [`AppSignal::AdvertiserAuthChanged`]
    pub signals: Arc<dyn SignalBus<AppSignal>>,
    /// Time between checks
    pub poll_interval: Duration,
}

impl AdvertiserEnvironment {
    /// Bundle dependencies
    #[must_use]
    pub fn new(
        api: Arc<dyn AdvertiserApi>,
        storage: Arc<dyn KeyValueStore>,
        signals: Arc<dyn SignalBus<AppSignal>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            storage,
            signals,
            poll_interval,
        }
    }
}

/// Advertiser session store
pub type AdvertiserStore =
    Store<AdvertiserState, AdvertiserAction, AdvertiserEnvironment, AdvertiserSessionReducer>;

/// Reducer for [`AdvertiserState`]
#[derive(Clone, Debug, Default)]
pub struct AdvertiserSessionReducer;

impl AdvertiserSessionReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check the session now and schedule the next tick
    fn poll(
        state: &mut AdvertiserState,
        env: &AdvertiserEnvironment,
    ) -> SmallVec<[Effect<AdvertiserAction>; 4]> {
        let tick = state.tick;
        let next = delay! {
            duration: env.poll_interval,
            action: AdvertiserAction::Poll { tick }
        };

        let has_token = env
            .storage
            .get(keys::ADVERTISER_TOKEN)
            .is_some_and(|token| !token.is_empty());
        if !has_token {
            state.profile = None;
            return smallvec![next];
        }

        let api = Arc::clone(&env.api);
        smallvec![
            async_effect! {
                match api.advertiser_me().await {
                    Ok(profile) => Some(AdvertiserAction::ProfileLoaded { tick, profile }),
                    Err(error) => Some(AdvertiserAction::PollFailed { tick, error }),
                }
            },
            next,
        ]
    }

    fn announce(env: &AdvertiserEnvironment, logged_in: bool) -> Effect<AdvertiserAction> {
        let signals = Arc::clone(&env.signals);
        fire_and_forget! {
            if let Err(error) = signals.publish(AppSignal::AdvertiserAuthChanged { logged_in }) {
                tracing::warn!(%error, "Could not announce advertiser session change");
            }
        }
    }
}

impl Reducer for AdvertiserSessionReducer {
    type State = AdvertiserState;
    type Action = AdvertiserAction;
    type Environment = AdvertiserEnvironment;

    fn reduce(
        &self,
        state: &mut AdvertiserState,
        action: AdvertiserAction,
        env: &AdvertiserEnvironment,
    ) -> SmallVec<[Effect<AdvertiserAction>; 4]> {
        match action {
            AdvertiserAction::Start => {
                if state.polling {
                    return SmallVec::new();
                }
                state.polling = true;
                state.tick += 1;
                tracing::debug!(tick = state.tick, interval = ?env.poll_interval, "Advertiser polling started");
                Self::poll(state, env)
            },

            AdvertiserAction::Poll { tick } => {
                if !state.polling || tick != state.tick {
                    return SmallVec::new();
                }
                Self::poll(state, env)
            },

            AdvertiserAction::ProfileLoaded { tick, profile } => {
                if tick == state.tick {
                    state.profile = Some(profile);
                }
                SmallVec::new()
            },

            AdvertiserAction::PollFailed { tick, error } => {
                if tick == state.tick {
                    tracing::debug!(%error, "Advertiser session check failed");
                    state.profile = None;
                }
                SmallVec::new()
            },

            AdvertiserAction::Stop => {
                state.polling = false;
                state.tick += 1;
                tracing::debug!("Advertiser polling stopped");
                SmallVec::new()
            },

            AdvertiserAction::Login { credentials } => {
                state.logging_in = true;
                state.login_error = None;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.advertiser_login(&credentials).await {
                        Ok(session) => Some(AdvertiserAction::LoggedIn { session }),
                        Err(error) => Some(AdvertiserAction::LoginFailed { error }),
                    }
                }]
            },

            AdvertiserAction::LoggedIn { session } => {
                tracing::info!(advertiser_id = %session.advertiser.id, "Advertiser logged in");
                state.logging_in = false;
                state.profile = Some(session.advertiser);

                let storage = Arc::clone(&env.storage);
                let token = session.token;
                smallvec![Effect::Sequential(vec![
                    fire_and_forget! {
                        storage.set(keys::ADVERTISER_TOKEN, &token);
                    },
                    Self::announce(env, true),
                ])]
            },

            AdvertiserAction::LoginFailed { error } => {
                tracing::warn!(%error, "Advertiser login failed");
                state.logging_in = false;
                state.login_error = Some(error);
                SmallVec::new()
            },

            AdvertiserAction::Logout => {
                tracing::info!("Advertiser logged out");
                state.profile = None;
                // checks already in flight belong to the old session
                state.tick += 1;
                let storage = Arc::clone(&env.storage);
                let mut effects = smallvec![Effect::Sequential(vec![
                    fire_and_forget! {
                        storage.remove(keys::ADVERTISER_TOKEN);
                    },
                    Self::announce(env, false),
                ])];
                if state.polling {
                    let tick = state.tick;
                    effects.push(delay! {
                        duration: env.poll_interval,
                        action: AdvertiserAction::Poll { tick }
                    });
                }
                effects
            },
        }
    }
}
