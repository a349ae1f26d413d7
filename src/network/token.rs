//! Bearer token cache for the Conductor API.
//!
//! Tokens come from `POST <server>/token` and are reused until they are older
//! than [`TOKEN_LIFETIME_HOURS`]. Refreshes are single-flight: callers that hit
//! a stale cache at the same time share one token request.

use crate::config::ConductorConfig;
use crate::error::{ConductorError, Result};
use crate::network::proxy::join_url;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maximum token age before a refresh is forced.
pub const TOKEN_LIFETIME_HOURS: i64 = 2;

/// Token value held before the first refresh.
pub const UNASSIGNED_TOKEN: &str = "UNASSIGNED";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    key_id: &'a str,
    key_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// A bearer token and the moment it was issued. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    /// Sentinel credential; always stale.
    pub fn unassigned() -> Self {
        Self::new(UNASSIGNED_TOKEN, DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.issued_at)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > Duration::hours(TOKEN_LIFETIME_HOURS)
    }
}

/// Process-wide token cache shared by every request.
pub struct TokenManager {
    client: Client,
    config: Arc<ConductorConfig>,
    current: RwLock<Arc<Credential>>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(client: Client, config: Arc<ConductorConfig>) -> Self {
        Self {
            client,
            config,
            current: RwLock::new(Arc::new(Credential::unassigned())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Start from an already issued credential instead of the sentinel.
    pub fn with_credential(self, credential: Credential) -> Self {
        *self.current.write() = Arc::new(credential);
        self
    }

    /// Snapshot of the cached credential
    pub fn current(&self) -> Arc<Credential> {
        self.current.read().clone()
    }

    /// Return a usable token, refreshing it first when the cached one is stale.
    ///
    /// On failure the cached credential is left as it was, so the next call
    /// tries again.
    pub async fn acquire_token(&self) -> Result<String> {
        let snapshot = self.current();
        if !snapshot.is_stale(Utc::now()) {
            return Ok(snapshot.token.clone());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let snapshot = self.current();
        if !snapshot.is_stale(Utc::now()) {
            return Ok(snapshot.token.clone());
        }

        tracing::info!("Refreshing token");
        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                return Err(e);
            }
        };

        let issued_at = Utc::now().max(snapshot.issued_at);
        *self.current.write() = Arc::new(Credential::new(token.clone(), issued_at));
        tracing::info!("Token refreshed at {}", issued_at);

        Ok(token)
    }

    async fn fetch_token(&self) -> Result<String> {
        let key_id = self.config.auth_key.as_deref().ok_or_else(|| {
            ConductorError::Config("Conductor auth key is not set (CONDUCTOR_AUTH_KEY)".to_string())
        })?;
        let key_secret = self.config.auth_secret.as_deref().ok_or_else(|| {
            ConductorError::Config(
                "Conductor auth secret is not set (CONDUCTOR_AUTH_SECRET)".to_string(),
            )
        })?;

        let url = join_url(&self.config.server_url, "token");
        tracing::debug!("Requesting token from {}", url);

        let body = serde_json::to_string(&TokenRequest { key_id, key_secret })?;
        let resp = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ConductorError::Auth(format!("token request to {} failed: {}", url, e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ConductorError::Auth(format!("failed to read token response: {}", e)))?;
        if !status.is_success() {
            return Err(ConductorError::Auth(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ConductorError::Auth(format!("malformed token response: {}", e)))?;
        Ok(parsed.token)
    }
}
