use async_trait::async_trait;
use serde::Deserialize;

use crate::models::auth::GoogleIdentity;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Black-box identity provider boundary. Production uses [`GoogleVerifier`];
/// tests substitute a stub.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Validate a provider-issued ID token. Any failure — network, non-2xx,
    /// malformed body, audience mismatch — yields `None`; nothing throws
    /// past this boundary.
    async fn verify(&self, assertion: &str) -> Option<GoogleIdentity>;
}

/// Shape of Google's tokeninfo response (the fields we consume).
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    /// Google returns this as the string "true"/"false".
    #[serde(default)]
    email_verified: Option<String>,
}

pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
}

impl GoogleVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, assertion: &str) -> Option<GoogleIdentity> {
        let response = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| tracing::warn!("tokeninfo request failed: {e}"))
            .ok()?;

        if !response.status().is_success() {
            tracing::warn!("tokeninfo returned {}", response.status());
            return None;
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| tracing::warn!("tokeninfo body unreadable: {e}"))
            .ok()?;

        if info.aud != self.client_id {
            tracing::warn!("tokeninfo audience mismatch");
            return None;
        }

        Some(GoogleIdentity {
            google_id: info.sub,
            email: info.email,
            name: info.name.unwrap_or_default(),
            avatar: info.picture,
            email_verified: info.email_verified.as_deref() == Some("true"),
        })
    }
}
