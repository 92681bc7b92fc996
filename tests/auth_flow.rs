//! End-to-end tests for the auth HTTP surface, driven through the router
//! with a stub identity provider and an in-memory user store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use deenara_api::config::Config;
use deenara_api::models::auth::GoogleIdentity;
use deenara_api::models::user::{NewUser, User};
use deenara_api::services::google::IdentityVerifier;
use deenara_api::services::users::{StoreError, UserPatch, UserStore};
use deenara_api::{build_router, AppState};

const JWT_SECRET: &str = "integration-test-secret";

/// Identity provider stub: assertions registered up front validate, any
/// other assertion (wrong audience, forged, expired) yields `None`.
struct StubVerifier {
    identities: HashMap<String, GoogleIdentity>,
}

impl StubVerifier {
    fn with_identity(assertion: &str, identity: GoogleIdentity) -> Self {
        let mut identities = HashMap::new();
        identities.insert(assertion.to_string(), identity);
        Self { identities }
    }

    fn rejecting_everything() -> Self {
        Self { identities: HashMap::new() }
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, assertion: &str) -> Option<GoogleIdentity> {
        self.identities.get(assertion).cloned()
    }
}

/// In-memory user store with the same uniqueness rules as the real table.
#[derive(Default)]
struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.google_id == google_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, fields: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == fields.email || u.google_id == fields.google_id)
        {
            return Err(StoreError::Duplicate);
        }
        let now = Utc::now();
        let user = User {
            id: users.len() as i64 + 1,
            email: fields.email,
            name: fields.name,
            google_id: fields.google_id,
            avatar: fields.avatar,
            role: fields.role.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::Duplicate)?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(avatar) = patch.avatar {
            user.avatar = Some(avatar);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        google_client_id: "deenara-client-id".into(),
        jwt_secret: JWT_SECRET.into(),
        frontend_url: "http://localhost:5173".into(),
        host: "127.0.0.1".into(),
        port: 0,
        secure_cookies: false,
    }
}

fn sample_identity() -> GoogleIdentity {
    GoogleIdentity {
        google_id: "google-sub-123".into(),
        email: "shopper@example.com".into(),
        name: "Shopper".into(),
        avatar: Some("https://example.com/shopper.png".into()),
        email_verified: true,
    }
}

fn app_with(
    verifier: StubVerifier,
) -> (axum::Router, Arc<MemoryUserStore>) {
    let store = Arc::new(MemoryUserStore::default());
    let state = AppState {
        store: store.clone(),
        verifier: Arc::new(verifier),
        config: Arc::new(test_config()),
    };
    (build_router(state), store)
}

fn login_request(assertion: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "credential": assertion }).to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_then_me_round_trip() {
    let (app, store) =
        app_with(StubVerifier::with_identity("good-assertion", sample_identity()));

    let response = app.clone().oneshot(login_request("good-assertion")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=604800"));

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["email"], json!("shopper@example.com"));
    // Role is deliberately absent from the login response shape.
    assert!(body["user"].get("role").is_none());
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_i64().unwrap();
    assert_eq!(store.len(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], json!(user_id));
    assert_eq!(body["user"]["role"], json!("user"));
}

#[tokio::test]
async fn me_without_credentials_is_unauthorized() {
    let (app, _store) = app_with(StubVerifier::rejecting_everything());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_accepts_the_session_cookie() {
    let (app, _store) =
        app_with(StubVerifier::with_identity("good-assertion", sample_identity()));

    let response = app.clone().oneshot(login_request("good-assertion")).await.unwrap();
    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, format!("token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_assertion_is_unauthorized_and_issues_nothing() {
    // Covers audience mismatch, forged and expired assertions alike: the
    // provider bridge reports them all as invalid.
    let (app, store) = app_with(StubVerifier::rejecting_everything());

    let response = app.oneshot(login_request("wrong-audience")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn missing_credential_is_a_bad_request() {
    let (app, _store) = app_with(StubVerifier::rejecting_everything());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_first_logins_create_a_single_user() {
    let (app, store) =
        app_with(StubVerifier::with_identity("good-assertion", sample_identity()));

    let (first, second) = tokio::join!(
        app.clone().oneshot(login_request("good-assertion")),
        app.clone().oneshot(login_request("good-assertion")),
    );
    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let (app, _store) = app_with(StubVerifier::rejecting_everything());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn preflight_is_short_circuited_with_cors_headers() {
    let (app, _store) = app_with(StubVerifier::rejecting_everything());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/login")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn init_db_reports_success() {
    let (app, _store) = app_with(StubVerifier::rejecting_everything());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/init-db")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn returning_login_refreshes_profile_fields() {
    let identity = sample_identity();
    let mut changed = identity.clone();
    changed.name = "Shopper Renamed".into();
    changed.avatar = Some("https://example.com/new.png".into());

    let mut identities = HashMap::new();
    identities.insert("first".to_string(), identity);
    identities.insert("second".to_string(), changed);
    let verifier = StubVerifier { identities };

    let (app, store) = app_with(verifier);

    let response = app.clone().oneshot(login_request("first")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(login_request("second")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["name"], json!("Shopper Renamed"));
    assert_eq!(store.len(), 1);
}
