//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use campus_config::ConfigError;
use campus_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the incident API at {url}")]
    #[diagnostic(
        code(campus::connection_failed),
        help(
            "Check the network and the api_url of your profile.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(campus::timeout),
        help("Increase the timeout with --timeout or check API responsiveness.")
    )]
    Timeout,

    // ── Authorization ────────────────────────────────────────────────
    #[error("Not allowed: {message}")]
    #[diagnostic(
        code(campus::forbidden),
        help("The API authorizes by email. Check --email or the profile's email.")
    )]
    Forbidden { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Incident '{identifier}' not found")]
    #[diagnostic(
        code(campus::not_found),
        help("Run: campus incidents list to see current incidents")
    )]
    NotFound { identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error{}: {message}", .status.map_or_else(String::new, |s| format!(" ({s})")))]
    #[diagnostic(code(campus::api_error))]
    Api { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(campus::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(campus::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: campus config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No profile configured and no --api-url/--ws-url/--email given")]
    #[diagnostic(
        code(campus::no_config),
        help(
            "Create one with: campus config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(campus::config))]
    Config(Box<ConfigError>),

    // ── Local state ──────────────────────────────────────────────────
    #[error("Notification history: {message}")]
    #[diagnostic(code(campus::history))]
    History { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(campus::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(campus::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoConfig { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::IncidentNotFound { identifier } => Self::NotFound { identifier },
            CoreError::Forbidden { message } => Self::Forbidden { message },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Api { message, status } => Self::Api { status, message },
            CoreError::History { message } => Self::History { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
