//! Client configuration

use std::time::Duration;

/// Configuration for the MediTurnos client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the MediTurnos API
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Path of the login endpoint. A 401 from any URL containing it is a
    /// failed login, not an expired session.
    pub login_path: String,

    /// User agent string
    pub user_agent: String,

    /// Delay before a failed query is retried
    pub retry_delay: Duration,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            login_path: "/login".to_string(),
            user_agent: format!("MediTurnos-Rust/{}", env!("CARGO_PKG_VERSION")),
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Set custom user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
