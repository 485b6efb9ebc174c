//! Error types for the MediTurnos client

use serde_json::Value;
use thiserror::Error;

/// Default message for a 401 without a backend message.
pub const UNAUTHORIZED_MESSAGE: &str = "Credenciales inválidas o sesión expirada.";
/// Default message for a 404 without a backend message.
pub const NOT_FOUND_MESSAGE: &str = "Endpoint no encontrado. Verifica la URL del servidor.";
/// Default message for a 5xx without a backend message.
pub const SERVER_ERROR_MESSAGE: &str = "Error interno del servidor. Intenta más tarde.";
/// The server could not be reached.
pub const CONNECTION_ERROR_MESSAGE: &str = "No se pudo conectar con el servidor.";
/// The server did not answer within the client timeout.
pub const TIMEOUT_ERROR_MESSAGE: &str = "El servidor tardó demasiado en responder.";
/// Any other failure without a response.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Error desconocido. Intenta de nuevo.";
/// A successful response whose body did not match the expected shape.
pub const INVALID_RESPONSE_MESSAGE: &str = "Respuesta inválida del servidor.";

/// The one error shape callers of the API ever see.
///
/// `status` is the HTTP status of the response, or 500 when no response was
/// received. `message` is never empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        Self { status, message }
    }

    /// Build an error from a non-success response.
    ///
    /// Message priority: the backend's `message` field, then the default for
    /// 401/404/5xx, then the transport library's own description.
    pub fn from_response(status: u16, body: &[u8], transport_message: impl Into<String>) -> Self {
        let message = backend_message(body)
            .or_else(|| default_message(status).map(str::to_string))
            .unwrap_or_else(|| transport_message.into());
        Self::new(status, message)
    }

    /// Build an error for a request that never produced a response.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            TIMEOUT_ERROR_MESSAGE
        } else if err.is_connect() {
            CONNECTION_ERROR_MESSAGE
        } else {
            UNKNOWN_ERROR_MESSAGE
        };
        let status = err.status().map(|s| s.as_u16()).unwrap_or(500);
        Self::new(status, message)
    }

    pub fn invalid_response() -> Self {
        Self::new(500, INVALID_RESPONSE_MESSAGE)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Only server-side and transport failures are worth another attempt.
    /// Retrying a 401 would end the session twice.
    pub fn is_retryable(&self) -> bool {
        self.is_server_error()
    }
}

fn backend_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

fn default_message(status: u16) -> Option<&'static str> {
    match status {
        401 => Some(UNAUTHORIZED_MESSAGE),
        404 => Some(NOT_FOUND_MESSAGE),
        500..=599 => Some(SERVER_ERROR_MESSAGE),
        _ => None,
    }
}

/// Failures of the credential storage medium. Never surfaced by the token
/// store, which treats persistence as best-effort.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors constructing a client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}
