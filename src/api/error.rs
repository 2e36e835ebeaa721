//! API Error Types
//!
//! Every failure of a request to the sensor platform surfaces as one of
//! these variants. Callers branch on them: `Unauthorized` always ends the
//! session, `Forbidden` only matters for admin operations, everything else
//! is shown locally with a retry action.

use thiserror::Error;

/// Failure of a request to the sensor platform API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never completed (connection refused, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// 401: token missing, invalid or expired
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// 403: authenticated but not allowed
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Any other non-2xx status
    #[error("API error {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// 2xx with a body that does not match the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Error body returned by the API: `{ "error": "..." }`
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Build the error for a non-2xx response from its status and raw body
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message));

        match status {
            401 => ApiError::Unauthorized {
                message: message.unwrap_or_else(|| "Unauthorized".to_string()),
            },
            403 => ApiError::Forbidden {
                message: message.unwrap_or_else(|| "Forbidden".to_string()),
            },
            _ => ApiError::Status { status, message },
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    /// Message supplied by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Forbidden { message } => Some(message),
            ApiError::Status { message, .. } => message.as_deref(),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ApiError::Forbidden { .. })
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ApiError::from_status(401, br#"{"error":"Token expirado"}"#);
        assert_eq!(
            err,
            ApiError::Unauthorized {
                message: "Token expirado".to_string()
            }
        );
        assert!(err.is_unauthorized());

        let err = ApiError::from_status(403, br#"{"error":"Permisos insuficientes"}"#);
        assert!(err.is_forbidden());
        assert_eq!(err.server_message(), Some("Permisos insuficientes"));

        let err = ApiError::from_status(500, b"<html>oops</html>");
        assert_eq!(
            err,
            ApiError::Status {
                status: 500,
                message: None
            }
        );
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 400,
            message: Some("days debe ser 7 o 30".to_string()),
        };
        assert_eq!(err.to_string(), "API error 400: days debe ser 7 o 30");

        let err = ApiError::Status {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "API error 502: no message");
        assert_eq!(ApiError::Network("refused".into()).status(), None);
    }
}
