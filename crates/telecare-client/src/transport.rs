//! Transport seam between the endpoint catalog and the network

use crate::envelope::{Envelope, message_from_body};
use crate::error::{ClientError, ClientResult, UNEXPECTED_ERROR_MESSAGE};
use crate::request::ApiRequest;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use telecare_core::ApiConfig;
use tracing::{debug, instrument, warn};

/// Bearer token shared between a transport and whoever logs in
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Store seeded with `token`
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token)),
        }
    }

    /// Current token
    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }

    /// Replace the token
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    /// Forget the token
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Whether a token is held
    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }
}

/// Something that can execute an [`ApiRequest`] and hand back the envelope
///
/// Implementations own bearer token attachment and 401 handling. A returned
/// `Ok` always has `success == true`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request
    async fn send(&self, request: ApiRequest) -> ClientResult<Envelope>;

    /// Token store used for the `Authorization` header
    fn tokens(&self) -> &TokenStore;
}

/// reqwest backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
    tokens: TokenStore,
}

impl HttpTransport {
    /// Build a transport from configuration
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            tokens: TokenStore::new(config.auth_token.clone()),
        })
    }

    /// Build a transport against `base_url` with default settings
    pub fn with_base_url(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::new(&ApiConfig {
            base_url: base_url.into(),
            ..ApiConfig::default()
        })
    }

    /// Seed the bearer token
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.tokens.set(token);
        self
    }

    /// Base URL every path is joined onto
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::timeout(self.timeout.as_secs())
        } else {
            ClientError::Http(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: ApiRequest) -> ClientResult<Envelope> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = self.tokens.get() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        if status == StatusCode::UNAUTHORIZED {
            warn!("session rejected by server, clearing stored token");
            self.tokens.clear();
            let message = message_from_body(&body).unwrap_or_else(|| "Unauthorized".to_string());
            return Err(ClientError::unauthorized(message));
        }

        if !status.is_success() {
            let message = message_from_body(&body)
                .or_else(|| status.canonical_reason().map(ToString::to_string))
                .unwrap_or_else(|| UNEXPECTED_ERROR_MESSAGE.to_string());
            return Err(ClientError::status(status.as_u16(), message));
        }

        Envelope::from_slice(&body)?.into_result()
    }

    fn tokens(&self) -> &TokenStore {
        &self.tokens
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_store() {
        let store = TokenStore::default();
        assert!(!store.is_set());

        let shared = store.clone();
        store.set("abc");
        assert_eq!(shared.get().as_deref(), Some("abc"));

        shared.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::with_base_url("http://localhost:5000/api/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:5000/api");
        assert_eq!(
            transport.url("/admin/users"),
            "http://localhost:5000/api/admin/users"
        );
        assert_eq!(transport.url("videos"), "http://localhost:5000/api/videos");
    }

    #[test]
    fn test_config_token_is_seeded() {
        let config = ApiConfig {
            auth_token: Some("seeded".to_string()),
            ..ApiConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.tokens().get().as_deref(), Some("seeded"));
    }
}
