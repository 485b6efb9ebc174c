//! Request Facade
//!
//! [`Requester::execute`] is the single normalization boundary: it picks the
//! credentials for the call, sends it, decodes the body on success and turns
//! every failure into an [`ApiError`].

use crate::error::ApiError;
use crate::http::HttpClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Parameters of one API call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    /// Whether the call carries the bearer token
    pub use_token: bool,
}

impl RequestDescriptor {
    /// An authenticated request. Use [`anonymous`](Self::anonymous) for
    /// endpoints that must not receive credentials.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            query: Vec::new(),
            use_token: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn anonymous(mut self) -> Self {
        self.use_token = false;
        self
    }

    pub fn with_token(mut self, use_token: bool) -> Self {
        self.use_token = use_token;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            warn!(error = %e, path = %self.path, "Failed to encode request body");
            ApiError::new(500, crate::error::UNKNOWN_ERROR_MESSAGE)
        })?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Issues [`RequestDescriptor`]s through the shared [`HttpClient`].
#[derive(Debug, Clone)]
pub struct Requester {
    http: Arc<HttpClient>,
}

impl Requester {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Execute a request and decode its JSON body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `Option<T>`, `()` and
    /// `Value` accept it.
    pub async fn execute<T>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let span = info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %descriptor.method,
            path = %descriptor.path,
            authenticated = descriptor.use_token,
        );

        self.execute_inner(descriptor).instrument(span).await
    }

    async fn execute_inner<T>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let authorization = if descriptor.use_token {
            self.http.authorize()
        } else {
            self.http.deauthorize()
        };
        if descriptor.use_token && authorization.is_anonymous() {
            debug!("No access token stored, sending without credentials");
        }

        let start = Instant::now();
        let response = match self.http.send(&descriptor, authorization).await {
            Ok(response) => response,
            Err(e) => {
                let error = ApiError::from_transport(&e);
                warn!(
                    error = %e,
                    status = error.status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request failed without a response"
                );
                return Err(error);
            }
        };

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(|e| {
                warn!(error = %e, "Failed to read response body");
                ApiError::from_transport(&e)
            })?;
            debug!(
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request succeeded"
            );
            return decode_body(&body);
        }

        let transport_message = response
            .error_for_status_ref()
            .err()
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("HTTP {}", status));
        let body = response.bytes().await.unwrap_or_default();
        let error = ApiError::from_response(status.as_u16(), &body, transport_message);

        warn!(
            status = error.status,
            message = %error.message,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request failed"
        );
        Err(error)
    }
}

/// Bodies that are not JSON are offered to `T` as a JSON string, so
/// plain-text acknowledgements decode into `Value` or `String`.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).trim().to_string()))
    };

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Response body did not match the expected shape");
        ApiError::invalid_response()
    })
}
