use serde::{Deserialize, Serialize};

use super::user::{SessionUser, UserRole};

/// Claims embedded in the session JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Decimal user id.
    pub sub: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

/// Identity returned by Google's tokeninfo endpoint after audience check.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub email_verified: bool,
}

/// Extracted from a validated session token — available via axum extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn into_session_user(self) -> SessionUser {
        SessionUser {
            id: self.user_id,
            email: self.email,
            name: self.name,
            avatar: self.avatar,
            role: self.role,
        }
    }
}
