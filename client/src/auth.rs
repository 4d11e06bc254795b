//! Signed-in user session.
//!
//! The session is restored from storage on start, verified against
//! `/auth/me`, and written back on login. A rejected token (401 while
//! refreshing the profile) ends the session.

use crate::api::AuthApi;
use crate::error::ApiError;
use crate::storage::keys;
use crate::types::{AuthSession, Credentials, Registration, Role, User};
use sorteohub_core::environment::KeyValueStore;
use sorteohub_core::request::{RequestGeneration, RequestToken};
use sorteohub_core::{SmallVec, async_effect, effect::Effect, fire_and_forget, reducer::Reducer, smallvec};
use sorteohub_runtime::Store;
use std::sync::Arc;

/// Which call failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOperation {
    /// `POST /auth/login`
    Login,
    /// `POST /auth/register`
    Register,
    /// `GET /auth/me`
    Profile,
}

/// Session state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Signed-in user
    pub user: Option<User>,
    /// Bearer token
    pub token: Option<String>,
    /// A login, registration or profile refresh is in flight
    pub loading: bool,
    /// Last failure, cleared by the next attempt
    pub error: Option<ApiError>,
    generation: RequestGeneration,
}

impl AuthState {
    /// Whether a user is signed in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    /// Whether the user is an administrator
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Whether the user organizes raffles (administrators count)
    #[must_use]
    pub fn is_organizer(&self) -> bool {
        matches!(self.role(), Some(Role::Organizer | Role::Admin))
    }

    /// Whether the creation wizard is available
    #[must_use]
    pub fn can_create_raffles(&self) -> bool {
        self.is_authenticated() && self.is_organizer()
    }

    fn end_session(&mut self) {
        self.user = None;
        self.token = None;
        self.loading = false;
        self.generation.invalidate();
    }
}

/// Session actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthAction {
    /// Load the stored session and verify it
    Restore,
    /// Sign in
    Login {
        /// Form values
        credentials: Credentials,
    },
    /// Create an account and sign in
    Register {
        /// Form values
        registration: Registration,
    },
    /// Login or registration succeeded
    LoggedIn {
        /// Request this answers
        request: RequestToken,
        /// Token and user
        session: AuthSession,
    },
    /// Re-read the user from `/auth/me`
    RefreshProfile,
    /// Profile refresh succeeded
    ProfileLoaded {
        /// Request this answers
        request: RequestToken,
        /// Current user
        user: User,
    },
    /// Sign out
    Logout,
    /// A call failed
    Failed {
        /// Request this answers
        request: RequestToken,
        /// Which call
        operation: AuthOperation,
        /// Why
        error: ApiError,
    },
}

/// Dependencies of the session store
#[derive(Clone)]
pub struct AuthEnvironment {
    /// Backend
    pub api: Arc<dyn AuthApi>,
    /// Persisted session
    pub storage: Arc<dyn KeyValueStore>,
}

impl AuthEnvironment {
    /// Bundle dependencies
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { api, storage }
    }
}

/// Session store
pub type AuthStore = Store<AuthState, AuthAction, AuthEnvironment, AuthReducer>;

/// Reducer for [`AuthState`]
#[derive(Clone, Debug, Default)]
pub struct AuthReducer;

impl AuthReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fetch_profile(
        state: &mut AuthState,
        env: &AuthEnvironment,
    ) -> SmallVec<[Effect<AuthAction>; 4]> {
        state.loading = true;
        state.error = None;
        let request = state.generation.next();
        let api = Arc::clone(&env.api);

        smallvec![async_effect! {
            match api.me().await {
                Ok(user) => Some(AuthAction::ProfileLoaded { request, user }),
                Err(error) => Some(AuthAction::Failed {
                    request,
                    operation: AuthOperation::Profile,
                    error,
                }),
            }
        }]
    }

    fn persist_user(env: &AuthEnvironment, token: Option<String>, user: &User) -> Effect<AuthAction> {
        let storage = Arc::clone(&env.storage);
        let serialized = serde_json::to_string(user);
        fire_and_forget! {
            if let Some(token) = token {
                storage.set(keys::TOKEN, &token);
            }
            match serialized {
                Ok(json) => storage.set(keys::USER, &json),
                Err(error) => tracing::warn!(%error, "Could not serialize user"),
            }
        }
    }

    fn clear_storage(env: &AuthEnvironment) -> Effect<AuthAction> {
        let storage = Arc::clone(&env.storage);
        fire_and_forget! {
            storage.remove(keys::TOKEN);
            storage.remove(keys::USER);
        }
    }
}

impl Reducer for AuthReducer {
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthEnvironment;

    fn reduce(
        &self,
        state: &mut AuthState,
        action: AuthAction,
        env: &AuthEnvironment,
    ) -> SmallVec<[Effect<AuthAction>; 4]> {
        match action {
            AuthAction::Restore => {
                let Some(token) = env.storage.get(keys::TOKEN).filter(|t| !t.is_empty()) else {
                    return SmallVec::new();
                };

                state.user = env
                    .storage
                    .get(keys::USER)
                    .and_then(|json| match serde_json::from_str::<User>(&json) {
                        Ok(user) => Some(user),
                        Err(error) => {
                            tracing::warn!(%error, "Discarding unreadable stored user");
                            None
                        },
                    });
                state.token = Some(token);
                tracing::debug!(cached_user = state.user.is_some(), "Session restored");

                Self::fetch_profile(state, env)
            },

            AuthAction::Login { credentials } => {
                state.loading = true;
                state.error = None;
                let request = state.generation.next();
                let api = Arc::clone(&env.api);

                smallvec![async_effect! {
                    match api.login(&credentials).await {
                        Ok(session) => Some(AuthAction::LoggedIn { request, session }),
                        Err(error) => Some(AuthAction::Failed {
                            request,
                            operation: AuthOperation::Login,
                            error,
                        }),
                    }
                }]
            },

            AuthAction::Register { registration } => {
                state.loading = true;
                state.error = None;
                let request = state.generation.next();
                let api = Arc::clone(&env.api);

                smallvec![async_effect! {
                    match api.register(&registration).await {
                        Ok(session) => Some(AuthAction::LoggedIn { request, session }),
                        Err(error) => Some(AuthAction::Failed {
                            request,
                            operation: AuthOperation::Register,
                            error,
                        }),
                    }
                }]
            },

            AuthAction::LoggedIn { request, session } => {
                if !state.generation.is_current(request) {
                    tracing::debug!(request = request.value(), "Ignoring stale login result");
                    return SmallVec::new();
                }

                tracing::info!(user_id = %session.user.id, role = session.user.role.as_str(), "Signed in");
                let effect = Self::persist_user(env, Some(session.token.clone()), &session.user);
                state.token = Some(session.token);
                state.user = Some(session.user);
                state.loading = false;
                smallvec![effect]
            },

            AuthAction::RefreshProfile => {
                if state.token.is_none() {
                    return SmallVec::new();
                }
                Self::fetch_profile(state, env)
            },

            AuthAction::ProfileLoaded { request, user } => {
                if !state.generation.is_current(request) {
                    tracing::debug!(request = request.value(), "Ignoring stale profile");
                    return SmallVec::new();
                }

                let effect = Self::persist_user(env, None, &user);
                state.user = Some(user);
                state.loading = false;
                smallvec![effect]
            },

            AuthAction::Logout => {
                tracing::info!("Signed out");
                state.end_session();
                state.error = None;
                smallvec![Self::clear_storage(env)]
            },

            AuthAction::Failed {
                request,
                operation,
                error,
            } => {
                if !state.generation.is_current(request) {
                    return SmallVec::new();
                }

                tracing::warn!(?operation, %error, "Authentication call failed");
                state.loading = false;

                if operation == AuthOperation::Profile && error.is_unauthorized() {
                    state.end_session();
                    state.error = Some(error);
                    return smallvec![Self::clear_storage(env)];
                }

                state.error = Some(error);
                SmallVec::new()
            },
        }
    }
}
