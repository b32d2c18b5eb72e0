// ── Runtime client configuration ──
//
// Describes which endpoints to use, who the viewer is, and the timing of
// reconnects, toasts and refreshes. Never touches disk; the CLI builds a
// `ClientConfig` from its profile and hands it in.

use std::time::Duration;

use campus_api::transport::TransportConfig;
use campus_api::websocket::ReconnectConfig;
use url::Url;

use crate::error::CoreError;
use crate::notify::PresenterConfig;

/// Configuration for one notification client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Incident API stage root (e.g. `https://api.example.edu/dev`).
    pub api_url: Url,
    /// Notification socket base (`ws://` or `wss://`).
    pub ws_url: String,
    /// Viewer email. Sent as the identity header and socket parameter.
    pub identity: String,
    pub reconnect: ReconnectConfig,
    /// Wait between a state-change frame and its re-fetch. Default: 1s.
    pub settle_delay: Duration,
    /// Wait before re-fetching after create/complete. Default: 500ms.
    pub mutation_refresh_delay: Duration,
    /// Merge refresh requests inside this window. Off by default.
    pub coalesce_window: Option<Duration>,
    pub presenter: PresenterConfig,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(api_url: Url, ws_url: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            api_url,
            ws_url: ws_url.into(),
            identity: identity.into(),
            reconnect: ReconnectConfig::default(),
            settle_delay: Duration::from_secs(1),
            mutation_refresh_delay: Duration::from_millis(500),
            coalesce_window: None,
            presenter: PresenterConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Reject settings no session can work with.
    ///
    /// The socket address is not checked; a bad address goes through the
    /// reconnect policy like any other failed open.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.identity.trim().is_empty() {
            return Err(CoreError::Config {
                message: "an identity (email) is required".into(),
            });
        }
        match self.api_url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(CoreError::Config {
                message: format!("API URL must be http or https, got '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(identity: &str, api: &str) -> ClientConfig {
        ClientConfig::new(api.parse().unwrap(), "wss://ws.example.edu/dev", identity)
    }

    #[test]
    fn defaults() {
        let c = config("ana@uni.edu", "https://api.example.edu/dev");
        assert_eq!(c.settle_delay, Duration::from_secs(1));
        assert_eq!(c.mutation_refresh_delay, Duration::from_millis(500));
        assert!(c.coalesce_window.is_none());
        assert!(c.reconnect.max_retries.is_none());
        assert_eq!(c.presenter.toast_lifetime, Duration::from_secs(10));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn blank_identity_is_rejected() {
        assert!(matches!(
            config("  ", "https://api.example.edu").validate(),
            Err(CoreError::Config { .. })
        ));
    }

    #[test]
    fn websocket_api_url_is_rejected() {
        assert!(config("ana@uni.edu", "wss://api.example.edu").validate().is_err());
    }
}
