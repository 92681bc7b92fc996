//! Production implementations of the client-side seams: an HTTP `AuthApi`
//! speaking to the deenara server and an in-process credential store.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::client::controller::{ApiError, AuthApi, CredentialStorage, LoginSuccess};
use crate::models::user::SessionUser;

/// In-process credential store. Browser deployments would back this with
/// localStorage; everything else keeps the token in memory.
#[derive(Default)]
pub struct MemoryStorage {
    token: Mutex<Option<String>>,
}

impl CredentialStorage for MemoryStorage {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn store(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.lock().unwrap() = None;
    }
}

#[derive(Debug, Deserialize)]
struct MeBody {
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    token: String,
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn error_from(response: reqwest::Response) -> ApiError {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => ApiError::Other(body.error),
        Err(_) if status == reqwest::StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        Err(_) => ApiError::Other(format!("request failed with status {status}")),
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn me(&self, token: &str) -> Result<SessionUser, ApiError> {
        let response = self
            .http
            .get(self.url("/api/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Other(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let body: MeBody = response
            .json()
            .await
            .map_err(|e| ApiError::Other(e.to_string()))?;
        Ok(body.user)
    }

    async fn login(&self, assertion: &str) -> Result<LoginSuccess, ApiError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "credential": assertion }))
            .send()
            .await
            .map_err(|e| ApiError::Other(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let body: LoginBody = response
            .json()
            .await
            .map_err(|e| ApiError::Other(e.to_string()))?;
        Ok(LoginSuccess {
            token: body.token,
            user: body.user,
        })
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        let mut request = self.http.post(self.url("/api/auth/logout"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Other(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }
}
