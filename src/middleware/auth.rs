use std::collections::HashMap;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
};

use crate::models::auth::AuthenticatedUser;
use crate::services::token;

/// Extension type carrying the signing secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Parse a raw `Cookie` header into name/value pairs. A segment without an
/// `=` maps to an empty value rather than an error.
pub fn parse_cookies(cookie_header: &str) -> HashMap<String, String> {
    cookie_header
        .split(';')
        .filter_map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }
            match segment.split_once('=') {
                Some((name, value)) => Some((name.to_string(), value.to_string())),
                None => Some((segment.to_string(), String::new())),
            }
        })
        .collect()
}

/// Resolve the session credential from a request. The `token` cookie wins
/// over an `Authorization: Bearer` header; no other source is consulted.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        if let Some(token) = parse_cookies(cookie_header).remove("token") {
            if !token.is_empty() {
                return Some(token);
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = extract_credential(&parts.headers)
            .ok_or((StatusCode::UNAUTHORIZED, "Not authenticated"))?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "JWT secret not configured"))?;

        token::verify_opt(&credential, &secret.0)
            .ok_or((StatusCode::UNAUTHORIZED, "Invalid or expired token"))
    }
}
