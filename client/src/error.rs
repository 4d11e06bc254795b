//! Structured errors for backend calls.
//!
//! The fetch layer classifies every failure once, at the point where the
//! HTTP status and body are known. Stores keep the [`ApiError`] as state and
//! views pick their copy from [`ApiError::kind`], never from the message text.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the backend client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused connection, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// 401 - missing, expired or rejected token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403 - authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404 - resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other 4xx, usually a validation failure reported by the backend
    #[error("Request rejected (status {status}): {message}")]
    Validation {
        /// HTTP status code
        status: u16,
        /// Message reported by the backend
        message: String,
    },

    /// 5xx
    #[error("Server error (status {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Message reported by the backend
        message: String,
    },

    /// 2xx whose body is not the JSON we expected
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The request could not be built (bad base URL, unreadable upload)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse classification used to choose user-facing copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connectivity problem
    Network,
    /// Session missing or expired
    Unauthorized,
    /// Not allowed
    Forbidden,
    /// Missing resource
    NotFound,
    /// Input rejected by the backend
    Validation,
    /// Backend failure
    Server,
    /// Unexpected response shape
    MalformedResponse,
    /// Client-side request problem
    InvalidRequest,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    msg: Option<serde_json::Value>,
}

impl ErrorBody {
    /// First non-blank string among `message`, `error` and `msg`
    fn into_message(self) -> Option<String> {
        [self.message, self.error, self.msg]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
                _ => None,
            })
    }
}

/// Pull the backend's human message out of an error body
///
/// Accepts `{"message": ...}`, `{"error": ...}` and `{"msg": ...}`, in that
/// order of preference; falls back to the raw text when the body is not JSON.
#[must_use]
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(body) => body.into_message(),
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}

impl ApiError {
    /// Classify a non-2xx response
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("HTTP {status}"));
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            400..=499 => Self::Validation { status, message },
            _ => Self::Server { status, message },
        }
    }

    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::Decode(_) => ErrorKind::MalformedResponse,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status, when the error came from a response
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Whether the session should be considered invalid
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether retrying later could help
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }

    /// Copy shown to the user
    ///
    /// Validation errors surface the backend's own message since it names
    /// the offending field; everything else maps to fixed text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "No se pudo conectar con el servidor. Revisa tu conexión e inténtalo de nuevo."
                    .to_string()
            },
            Self::Unauthorized(_) => "Tu sesión expiró. Inicia sesión nuevamente.".to_string(),
            Self::Forbidden(_) => "No tienes permiso para realizar esta acción.".to_string(),
            Self::NotFound(_) => "El recurso solicitado no existe.".to_string(),
            Self::Validation { message, .. } => message.clone(),
            Self::Server { .. } => {
                "Ocurrió un error en el servidor. Inténtalo más tarde.".to_string()
            },
            Self::Decode(_) => "Respuesta inesperada del servidor.".to_string(),
            Self::InvalidRequest(_) => "La solicitud no es válida.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else if error.is_builder() {
            Self::InvalidRequest(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}
