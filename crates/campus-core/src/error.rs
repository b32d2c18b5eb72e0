// ── Core error types ──
//
// User-facing errors from campus-core. Consumers never see raw reqwest
// errors or JSON parse failures; `From<campus_api::Error>` translates
// transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach incident API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Incident not found: {identifier}")]
    IncidentNotFound { identifier: String },

    #[error("Not allowed: {message}")]
    Forbidden { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Notification history error: {message}")]
    History { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status code, if the error came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::IncidentNotFound { .. } => Some(404),
            Self::Forbidden { .. } => Some(403),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<campus_api::Error> for CoreError {
    fn from(err: campus_api::Error) -> Self {
        match err {
            campus_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            campus_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            campus_api::Error::UnsupportedScheme { scheme, expected } => CoreError::Config {
                message: format!("Unsupported URL scheme '{scheme}' (expected {expected})"),
            },
            campus_api::Error::InvalidIdentity { identity } => CoreError::Config {
                message: format!("Email '{identity}' cannot be sent as a request header"),
            },
            campus_api::Error::ClientBuild(msg) => {
                CoreError::Internal(format!("Failed to build HTTP client: {msg}"))
            }
            campus_api::Error::Api { status: 404, message } => {
                CoreError::IncidentNotFound { identifier: message }
            }
            campus_api::Error::Api {
                status: 401 | 403,
                message,
            } => CoreError::Forbidden { message },
            campus_api::Error::Api {
                status: 400,
                message,
            } => CoreError::ValidationFailed { message },
            campus_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            campus_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            campus_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            campus_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response from incident API: {message}"))
            }
        }
    }
}
