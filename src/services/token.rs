use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::models::auth::{AuthenticatedUser, Claims};
use crate::models::user::User;

/// Session tokens live for 7 days; re-issuance only happens via a fresh login.
pub const TOKEN_TTL_SECONDS: usize = 60 * 60 * 24 * 7;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("user record is missing required field: {0}")]
    MissingField(&'static str),
    #[error("failed to sign token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    Invalid,
}

/// Sign a session token for `user`. Refuses only when a required
/// identity field is absent.
pub fn issue(user: &User, secret: &str) -> Result<String, TokenError> {
    if user.email.is_empty() {
        return Err(TokenError::MissingField("email"));
    }

    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
        role: user.role(),
        iat: now,
        exp: now + TOKEN_TTL_SECONDS,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Decode and validate a session token. Expired, tampered and malformed
/// tokens are all collapsed to `TokenError::Invalid` — callers get no
/// distinction, and nothing ever escapes this layer as a panic.
pub fn verify(token: &str, secret: &str) -> Result<AuthenticatedUser, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|_| TokenError::Invalid)?;
    let claims = data.claims;

    Ok(AuthenticatedUser {
        user_id: claims.sub.parse().map_err(|_| TokenError::Invalid)?,
        email: claims.email,
        name: claims.name,
        avatar: claims.avatar,
        role: claims.role,
    })
}

/// Nullable form of [`verify`] for callers that only care about valid/invalid.
pub fn verify_opt(token: &str, secret: &str) -> Option<AuthenticatedUser> {
    verify(token, secret).ok()
}
