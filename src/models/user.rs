use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct — role is fetched as TEXT and parsed on the way out.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub google_id: String,
    pub avatar: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or_default()
    }
}

/// Fields required to create a user on first Google login.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub google_id: String,
    pub avatar: Option<String>,
    pub role: UserRole,
}

// Request/Response DTOs

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Google ID token obtained by the browser.
    pub credential: Option<String>,
}

/// User shape returned by the login endpoint. Role is intentionally absent;
/// callers that need it go through `/api/auth/me`.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            avatar: u.avatar.clone(),
        }
    }
}

/// User shape held by an authenticated client session (includes role).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    /// The login response omits role; it defaults to `user` until the next
    /// who-am-I call reports it.
    #[serde(default)]
    pub role: UserRole,
}
