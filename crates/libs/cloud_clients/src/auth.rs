use crate::AuthError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Env var that short-circuits metadata-server auth with a fixed token, for
/// local runs and emulators.
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Fetches and caches OAuth2 access tokens from the instance metadata server.
pub struct TokenSource {
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, AuthError> {
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            return Ok(token);
        }

        let mut cached = self.cached.lock().await;
        if let Some(existing) = cached.as_ref() {
            if existing.expires_at > Instant::now() {
                return Ok(existing.value.clone());
            }
        }

        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status()));
        }
        let token: TokenResponse = response.json().await?;
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in)
            - EXPIRY_MARGIN.min(Duration::from_secs(token.expires_in));
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });
        Ok(value)
    }
}
