//! Pure auth state machine for the browsing client.
//!
//! States: `Bootstrapping -> {Authenticated, Anonymous}`, then
//! `Authenticated <-> Anonymous` via explicit login/logout. The reducer is
//! a plain function over (state, event) so it can be tested without any UI
//! or network in the loop.

use crate::models::user::{SessionUser, UserRole};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Startup: resolving whether a stored credential is still valid.
    Bootstrapping,
    Anonymous { error: Option<String> },
    Authenticated(SessionUser),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    /// Derived, never stored independently.
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthState::Authenticated(u) if u.role == UserRole::Admin)
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            AuthState::Authenticated(u) => Some(u),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AuthState::Anonymous { error } => error.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Bootstrap found no stored credential.
    StorageEmpty,
    /// Bootstrap validated the stored credential.
    BootstrapOk(SessionUser),
    /// Stored credential was rejected; it has been discarded. Not an error
    /// worth surfacing — the user simply is not logged in.
    BootstrapFailed,
    LoginOk(SessionUser),
    LoginFailed(String),
    LoggedOut,
}

/// Reducer-style transition function. Events that have no edge from the
/// current state leave it unchanged (last-write-wins, no queuing).
pub fn transition(state: &AuthState, event: AuthEvent) -> AuthState {
    match (state, event) {
        (AuthState::Bootstrapping, AuthEvent::StorageEmpty)
        | (AuthState::Bootstrapping, AuthEvent::BootstrapFailed) => {
            AuthState::Anonymous { error: None }
        }
        (AuthState::Bootstrapping, AuthEvent::BootstrapOk(user)) => {
            AuthState::Authenticated(user)
        }
        (_, AuthEvent::LoginOk(user)) => AuthState::Authenticated(user),
        (_, AuthEvent::LoginFailed(message)) => AuthState::Anonymous {
            error: Some(message),
        },
        (_, AuthEvent::LoggedOut) => AuthState::Anonymous { error: None },
        (state, _) => state.clone(),
    }
}

/// What a guarded route should do given the current auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Still bootstrapping — render a neutral loading view, never flash
    /// protected content or redirect prematurely.
    Loading,
    RedirectToLogin,
    /// Authenticated but lacking the required role.
    RedirectHome,
    Allow,
}

/// Gate a protected view. `required_role` of `None` means any
/// authenticated user may enter.
pub fn gate(state: &AuthState, required_role: Option<UserRole>) -> RouteDecision {
    match state {
        AuthState::Bootstrapping => RouteDecision::Loading,
        AuthState::Anonymous { .. } => RouteDecision::RedirectToLogin,
        AuthState::Authenticated(user) => match required_role {
            Some(role) if user.role != role => RouteDecision::RedirectHome,
            _ => RouteDecision::Allow,
        },
    }
}
