//! Authenticated pass-through to the Conductor REST API.
//!
//! Every call returns the raw response body. Status codes are not inspected;
//! an upstream 404 or 500 comes back as text for the caller to read.

use crate::config::ConductorConfig;
use crate::error::{ConductorError, Result};
use crate::network::token::TokenManager;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Header carrying the bearer token on resource requests.
pub const AUTHORIZATION_HEADER: &str = "X-Authorization";

/// Content type sent with every resource request.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Extra request headers; entries replace the defaults on name collision.
pub type Headers = HashMap<String, String>;

/// Join a base address and a relative resource path with exactly one `/`,
/// keeping any path prefix the base already has.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// HTTP client for Conductor resource endpoints.
/// Clone is cheap: the reqwest client and token cache are shared.
#[derive(Clone)]
pub struct HttpProxy {
    client: Client,
    config: Arc<ConductorConfig>,
    tokens: Arc<TokenManager>,
}

impl HttpProxy {
    pub fn new(client: Client, config: Arc<ConductorConfig>, tokens: Arc<TokenManager>) -> Self {
        Self {
            client,
            config,
            tokens,
        }
    }

    /// Build the client, token cache and proxy for `config` in one go.
    pub fn from_config(config: ConductorConfig) -> Self {
        let client = Client::new();
        let config = Arc::new(config);
        let tokens = Arc::new(TokenManager::new(client.clone(), config.clone()));
        Self::new(client, config, tokens)
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.config.server_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<String> {
        self.send(Method::GET, path, None, &Headers::new()).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        additional_headers: &Headers,
    ) -> Result<String> {
        self.send(Method::POST, path, Some(body), additional_headers).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        additional_headers: &Headers,
    ) -> Result<String> {
        self.send(Method::PUT, path, body, additional_headers).await
    }

    pub async fn delete(&self, path: &str) -> Result<String> {
        self.send(Method::DELETE, path, None, &Headers::new()).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        additional_headers: &Headers,
    ) -> Result<String> {
        let url = self.url_for(path);
        tracing::debug!("Requesting url: {} {}", method, url);

        // Built before the token so a bad caller header costs no refresh.
        let extra = Self::header_map(additional_headers)?;
        let token = self.tokens.acquire_token().await?;

        let mut headers = HeaderMap::new();
        let token_value = HeaderValue::from_str(&token).map_err(|e| {
            ConductorError::InvalidHeader(format!("{}: {}", AUTHORIZATION_HEADER, e))
        })?;
        headers.insert(HeaderName::from_static("x-authorization"), token_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        for (name, value) in extra {
            if let Some(name) = name {
                headers.insert(name, value);
            }
        }

        let mut req = self.client.request(method, &url).headers(headers);
        if let Some(body) = body {
            req = req.body(serde_json::to_string(body)?);
        }

        let resp = req.send().await?;
        Ok(resp.text().await?)
    }

    fn header_map(headers: &Headers) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConductorError::InvalidHeader(format!("{}: {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConductorError::InvalidHeader(format!("{}: {}", name, e)))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}
