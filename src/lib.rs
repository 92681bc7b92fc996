// Library exports for the binary and the integration tests
pub mod client;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::auth::JwtSecret;
use services::google::IdentityVerifier;
use services::users::UserStore;

/// Application state shared across all handlers. The store and identity
/// verifier sit behind trait objects so tests can substitute stubs.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub config: Arc<Config>,
}

/// Assemble the HTTP surface with CORS and tracing layers applied.
/// Preflight `OPTIONS` requests are short-circuited by the CORS layer.
pub fn build_router(state: AppState) -> Router {
    // Credentialed CORS: echo only the configured frontend origin.
    let frontend = state.config.frontend_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin.to_str().map(|o| o == frontend).unwrap_or(false)
    });

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/init-db", get(routes::auth::init_db))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
