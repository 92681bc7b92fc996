//! Async controller driving the auth state machine.
//!
//! Holds the current [`AuthState`], persists the session token through a
//! [`CredentialStorage`], and talks to the server through an [`AuthApi`].
//! Every state update goes through the reducer; a monotonic request
//! generation makes sure a late-arriving response from a superseded call
//! cannot overwrite newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::machine::{transition, AuthEvent, AuthState};
use crate::models::user::SessionUser;

/// Client-side credential persistence (the localStorage analog).
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str);
    fn clear(&self);
}

impl<T: CredentialStorage + ?Sized> CredentialStorage for std::sync::Arc<T> {
    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn store(&self, token: &str) {
        (**self).store(token)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: String,
    pub user: SessionUser,
}

/// The server's auth surface as seen by the client.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn me(&self, token: &str) -> Result<SessionUser, ApiError>;
    async fn login(&self, assertion: &str) -> Result<LoginSuccess, ApiError>;
    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError>;
}

/// Result shape handed back to UI code — actions never return `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl ActionOutcome {
    fn ok() -> Self {
        Self { success: true, error: None }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

pub struct AuthController<S, A> {
    storage: S,
    api: A,
    state: Mutex<AuthState>,
    generation: AtomicU64,
}

impl<S: CredentialStorage, A: AuthApi> AuthController<S, A> {
    pub fn new(storage: S, api: A) -> Self {
        Self {
            storage,
            api,
            state: Mutex::new(AuthState::Bootstrapping),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.lock().unwrap().clone()
    }

    /// Start a new request generation, superseding any in-flight call.
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `event` through the reducer unless a newer call has started
    /// since `generation` was taken.
    fn apply_if_current(&self, generation: u64, event: AuthEvent) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        *state = transition(&state, event);
        true
    }

    /// Resolve the stored credential into a session, exactly once at
    /// startup. Single-flight is guaranteed by the `Bootstrapping` state:
    /// a second call finds the machine already resolved and does nothing.
    pub async fn bootstrap(&self) {
        if !matches!(self.state(), AuthState::Bootstrapping) {
            return;
        }
        let generation = self.next_generation();

        let token = match self.storage.load() {
            Some(token) => token,
            None => {
                self.apply_if_current(generation, AuthEvent::StorageEmpty);
                return;
            }
        };

        match self.api.me(&token).await {
            Ok(user) => {
                self.apply_if_current(generation, AuthEvent::BootstrapOk(user));
            }
            Err(_) => {
                // Stale or rejected credential: discard it and land in
                // Anonymous without surfacing an error. Skipped when a
                // newer action has superseded this bootstrap, so its
                // freshly stored token is not erased.
                if self.apply_if_current(generation, AuthEvent::BootstrapFailed) {
                    self.storage.clear();
                }
            }
        }
    }

    /// Exchange a Google assertion for a session. Never retried
    /// automatically; a failure leaves the machine Anonymous with the
    /// error message recorded.
    pub async fn login_with_google(&self, assertion: &str) -> ActionOutcome {
        let generation = self.next_generation();

        match self.api.login(assertion).await {
            Ok(success) => {
                if self.apply_if_current(generation, AuthEvent::LoginOk(success.user)) {
                    self.storage.store(&success.token);
                }
                ActionOutcome::ok()
            }
            Err(e) => {
                let message = e.to_string();
                self.apply_if_current(generation, AuthEvent::LoginFailed(message.clone()));
                ActionOutcome::failed(message)
            }
        }
    }

    /// Log out. Local state is cleared even when the server call fails —
    /// a network error must not leave the UI stuck authenticated.
    pub async fn logout(&self) -> ActionOutcome {
        let generation = self.next_generation();

        let token = self.storage.load();
        let server_result = self.api.logout(token.as_deref()).await;

        self.storage.clear();
        self.apply_if_current(generation, AuthEvent::LoggedOut);

        match server_result {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(e.to_string()),
        }
    }
}
