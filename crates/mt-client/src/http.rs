//! HTTP Client
//!
//! One shared `reqwest::Client` with a fixed base URL and timeout. Whether a
//! request carries the bearer token is decided per request: [`HttpClient::authorize`]
//! and [`HttpClient::deauthorize`] return an [`Authorization`] value that
//! the caller hands to [`HttpClient::send`] together with the request. No
//! header state is shared between requests, so concurrent authenticated and
//! anonymous calls cannot leak into each other.
//!
//! Every response passes through a session check: a 401 from anywhere but the
//! login endpoint clears the token store and notifies the [`SessionObserver`].

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::RequestDescriptor;
use crate::token_store::TokenStore;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Credentials to attach to one request.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    Bearer(String),
    Anonymous,
}

impl Authorization {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Authorization::Anonymous)
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authorization::Bearer(_) => f.write_str("Bearer(***)"),
            Authorization::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Notified when the backend rejects the stored credentials.
///
/// By the time this runs the token store has already been cleared.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn session_expired(&self, login_path: &str);
}

/// Observer that only records the expiry in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSessionObserver;

#[async_trait]
impl SessionObserver for LogSessionObserver {
    async fn session_expired(&self, login_path: &str) {
        info!(login_path, "Session expired, sign in again");
    }
}

pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    login_path: String,
    tokens: TokenStore,
    observer: Arc<dyn SessionObserver>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            tokens,
            observer: Arc::new(LogSessionObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Credentials for an authenticated request, read from the token store
    /// now. Anonymous when no token is stored.
    pub fn authorize(&self) -> Authorization {
        match self.tokens.get_access_token() {
            Some(token) => Authorization::Bearer(token),
            None => Authorization::Anonymous,
        }
    }

    /// Credentials for an unauthenticated request.
    pub fn deauthorize(&self) -> Authorization {
        Authorization::Anonymous
    }

    /// Send one request with the given credentials.
    pub async fn send(
        &self,
        descriptor: &RequestDescriptor,
        authorization: Authorization,
    ) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, descriptor.path);

        let mut builder = self
            .http
            .request(descriptor.method.clone(), &url)
            .headers(descriptor.headers.clone());

        if !descriptor.query.is_empty() {
            builder = builder.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            builder = builder.json(body);
        }
        if let Authorization::Bearer(token) = &authorization {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let path = response.url().path().to_string();
            self.session_rejected(&path).await;
        }
        Ok(response)
    }

    async fn session_rejected(&self, path: &str) {
        if path.contains(self.login_path.as_str()) {
            return;
        }

        warn!(path, "Backend rejected credentials, ending session");
        self.tokens.clear();
        self.observer.session_expired(&self.login_path).await;
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("login_path", &self.login_path)
            .field("tokens", &self.tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_reads_current_token() {
        let tokens = TokenStore::in_memory();
        let client = HttpClient::new(&ClientConfig::default(), tokens.clone()).unwrap();

        assert_eq!(client.authorize(), Authorization::Anonymous);

        tokens.set_access_token("abc");
        assert_eq!(client.authorize(), Authorization::Bearer("abc".into()));

        tokens.remove_access_token();
        assert_eq!(client.authorize(), Authorization::Anonymous);
    }

    #[test]
    fn test_deauthorize_is_idempotent() {
        let client = HttpClient::new(&ClientConfig::default(), TokenStore::in_memory()).unwrap();
        assert!(client.deauthorize().is_anonymous());
        assert!(client.deauthorize().is_anonymous());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = HttpClient::new(&ClientConfig::new("api.example.com"), TokenStore::in_memory());
        assert!(matches!(result, Err(ClientError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_debug_redacts_bearer() {
        let auth = Authorization::Bearer("secret".into());
        assert_eq!(format!("{:?}", auth), "Bearer(***)");
    }
}
