use serde::{Deserialize, Serialize};

/// Environment variable holding the Conductor REST API root (e.g. "https://host/api").
pub const CONDUCTOR_SERVER_URL: &str = "CONDUCTOR_SERVER_URL";

/// Environment variable holding the application key id used for token issuance.
pub const CONDUCTOR_AUTH_KEY: &str = "CONDUCTOR_AUTH_KEY";

/// Environment variable holding the application key secret used for token issuance.
pub const CONDUCTOR_AUTH_SECRET: &str = "CONDUCTOR_AUTH_SECRET";

/// Server URL used when running with `local_dev` and nothing else supplies one.
pub const LOCAL_DEV_SERVER_URL: &str = "https://developer.orkescloud.com/api";

/// Connection settings for a Conductor server.
///
/// Built once at startup and shared by the token manager and the HTTP proxy.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConductorConfig {
    /// Root address of the Conductor REST API
    #[serde(default)]
    pub server_url: String,

    /// Key id for `POST /token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,

    /// Key secret for `POST /token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
}

impl ConductorConfig {
    pub fn new(
        server_url: impl Into<String>,
        auth_key: impl Into<String>,
        auth_secret: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            auth_key: Some(auth_key.into()),
            auth_secret: Some(auth_secret.into()),
        }
    }

    /// Overlay non-empty values from `other` on top of `self`.
    pub fn merge(mut self, other: ConductorConfig) -> Self {
        if !other.server_url.is_empty() {
            self.server_url = other.server_url;
        }
        if other.auth_key.is_some() {
            self.auth_key = other.auth_key;
        }
        if other.auth_secret.is_some() {
            self.auth_secret = other.auth_secret;
        }
        self
    }
}

// Hand-written so the secret never lands in logs.
impl std::fmt::Debug for ConductorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConductorConfig")
            .field("server_url", &self.server_url)
            .field("auth_key", &self.auth_key)
            .field("auth_secret", &self.auth_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
