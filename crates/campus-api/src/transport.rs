// Shared transport configuration for building reqwest::Client instances.
//
// Every request to the incident API carries the viewer's identity header,
// so the header is installed once as a client default here.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::Error;

/// Header the incident API uses for server-side authorization.
pub const IDENTITY_HEADER: &str = "x-user-email";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("campus-notify/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` that sends `identity` on every request.
    pub fn build_client(&self, identity: &str) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(identity).map_err(|_| Error::InvalidIdentity {
            identity: identity.escape_debug().to_string(),
        })?;
        headers.insert(HeaderName::from_static(IDENTITY_HEADER), value);

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}
