use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::{
    models::{
        auth::AuthenticatedUser,
        user::{LoginRequest, NewUser, PublicUser, UserRole},
    },
    services::{
        token::{self, TOKEN_TTL_SECONDS},
        users::{self, UserPatch},
    },
    AppState,
};

/// `Set-Cookie` value carrying the session token.
fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie =
        format!("token={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={TOKEN_TTL_SECONDS}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session token immediately.
fn clear_cookie() -> String {
    "token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0".to_string()
}

/// Build a JSON response with an attached `Set-Cookie` header.
fn json_response_with_cookie(body: &Value, cookie: &str) -> Response {
    let body_str = serde_json::to_string(body).unwrap_or_default();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::SET_COOKIE, cookie)
        .body(Body::from(body_str))
        .unwrap()
}

fn internal_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}

/// POST /api/auth/login — exchange a Google ID token for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let credential = match body.credential.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Google credential is required" })),
            ))
        }
    };

    let identity = match state.verifier.verify(credential).await {
        Some(identity) => identity,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid Google token" })),
            ))
        }
    };

    let user = users::find_or_create(
        state.store.as_ref(),
        NewUser {
            email: identity.email.clone(),
            name: identity.name.clone(),
            google_id: identity.google_id.clone(),
            avatar: identity.avatar.clone(),
            role: UserRole::User,
        },
    )
    .await
    .map_err(|e| {
        tracing::error!("login: user lookup/create failed: {e}");
        internal_error()
    })?;

    // Refresh profile fields Google has changed since the last login.
    let user = if user.name != identity.name || user.avatar != identity.avatar {
        state
            .store
            .update(
                user.id,
                UserPatch {
                    name: Some(identity.name),
                    avatar: identity.avatar,
                },
            )
            .await
            .map_err(|e| {
                tracing::error!("login: profile refresh failed: {e}");
                internal_error()
            })?
    } else {
        user
    };

    let token = token::issue(&user, &state.config.jwt_secret).map_err(|e| {
        tracing::error!("login: token issue failed: {e}");
        internal_error()
    })?;

    let body = json!({
        "success": true,
        "token": token,
        "user": PublicUser::from(&user),
    });
    Ok(json_response_with_cookie(
        &body,
        &session_cookie(&token, state.config.secure_cookies),
    ))
}

/// GET /api/auth/me — resolve the current session from the verified claims
/// alone; no database round-trip.
pub async fn me(user: AuthenticatedUser) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": user.into_session_user(),
    }))
}

/// POST /api/auth/logout — clear the session cookie. The token itself stays
/// valid until natural expiry; there is no server-side revocation list.
pub async fn logout() -> Response {
    json_response_with_cookie(&json!({ "success": true }), &clear_cookie())
}

/// GET /api/auth/init-db — idempotent schema setup.
pub async fn init_db(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state.store.init_schema().await.map_err(|e| {
        tracing::error!("init-db failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to initialize database" })),
        )
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Database tables initialized successfully",
    })))
}
