// Incident API HTTP client
//
// Wraps `reqwest::Client` with URL construction, identity headers and
// error-body extraction for the incident endpoints. Responses are
// normalized before the caller sees them.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    AssignRequest, Incident, IncidentDraft, IncidentPatch, ListEnvelope, Worker, decode_records,
};
use crate::transport::TransportConfig;

/// HTTP client for the incident API.
///
/// Every request carries the viewer identity header so the server can
/// filter by role: students see their own incidents, workers see their
/// assignments, administrators see everything.
#[derive(Clone)]
pub struct IncidentClient {
    http: reqwest::Client,
    base_url: Url,
    identity: String,
}

impl IncidentClient {
    /// Create a client for `base_url` (the stage root, e.g.
    /// `https://api.example.edu/dev`) acting as `identity`.
    pub fn new(base_url: Url, identity: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client(identity)?;
        Ok(Self::with_client(http, base_url, identity))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for the identity header on `http`.
    pub fn with_client(http: reqwest::Client, base_url: Url, identity: &str) -> Self {
        Self {
            http,
            base_url,
            identity: identity.to_owned(),
        }
    }

    /// The identity this client acts as.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append `segments` to the base URL, keeping any stage prefix.
    ///
    /// Each segment is percent-encoded, so an id containing `/`, `?` or `#`
    /// stays a single path segment.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List incidents visible to this identity.
    ///
    /// `GET /incidentes`
    pub async fn list_incidents(&self) -> Result<Vec<Incident>, Error> {
        let url = self.api_url(&["incidentes"])?;
        debug!("listing incidents");
        let envelope: ListEnvelope<Value> = self.get(url).await?;
        Ok(decode_records(envelope.into_items()))
    }

    /// Report a new incident.
    ///
    /// `POST /incidentes`
    pub async fn create_incident(&self, draft: &IncidentDraft) -> Result<Incident, Error> {
        let url = self.api_url(&["incidentes"])?;
        debug!(title = %draft.title, "creating incident");
        self.send(self.http.post(url).json(draft)).await
    }

    /// Edit title, description, category or severity.
    ///
    /// `PUT /incidentes/{id}`
    pub async fn update_incident(
        &self,
        id: &str,
        patch: &IncidentPatch,
    ) -> Result<serde_json::Value, Error> {
        let url = self.api_url(&["incidentes", id])?;
        debug!(id, "updating incident");
        self.put(url, patch).await
    }

    /// Assign an incident to a worker.
    ///
    /// `PUT /incidentes/{id}/asignar` with `{"trabajador_email": "..."}`
    pub async fn assign_incident(
        &self,
        id: &str,
        worker_email: &str,
    ) -> Result<serde_json::Value, Error> {
        let url = self.api_url(&["incidentes", id, "asignar"])?;
        debug!(id, worker_email, "assigning incident");
        let body = AssignRequest {
            trabajador_email: worker_email.to_owned(),
        };
        self.put(url, &body).await
    }

    /// Mark an assigned incident as completed.
    ///
    /// `PUT /incidentes/{id}/completar`
    pub async fn complete_incident(&self, id: &str) -> Result<serde_json::Value, Error> {
        let url = self.api_url(&["incidentes", id, "completar"])?;
        debug!(id, "completing incident");
        self.send(self.http.put(url)).await
    }

    /// List registered workers.
    ///
    /// `GET /users?tipo=trabajador`
    pub async fn list_workers(&self) -> Result<Vec<Worker>, Error> {
        let mut url = self.api_url(&["users"])?;
        url.query_pairs_mut().append_pair("tipo", "trabajador");
        debug!("listing workers");
        let envelope: ListEnvelope<Value> = self.get(url).await?;
        Ok(decode_records(envelope.into_items()))
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        self.send(self.http.get(url)).await
    }

    async fn put<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("PUT {}", url);
        self.send(self.http.put(url).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, Error> {
        let resp = request.send().await.map_err(Error::Transport)?;
        Self::parse_response(resp).await
    }

    /// Decode a success body, or turn an error status into `Error::Api`
    /// using the server's `error`/`message` field when present.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_owned()
                }),
            });
        }

        // Some endpoints answer 2xx with an empty body.
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> IncidentClient {
        IncidentClient::with_client(reqwest::Client::new(), base.parse().unwrap(), "ana@uni.edu")
    }

    #[test]
    fn api_url_keeps_stage_prefix() {
        let c = client("https://api.example.edu/dev");
        assert_eq!(
            c.api_url(&["incidentes", "42", "asignar"]).unwrap().as_str(),
            "https://api.example.edu/dev/incidentes/42/asignar"
        );
    }

    #[test]
    fn api_url_tolerates_trailing_slash() {
        let c = client("https://api.example.edu/dev/");
        assert_eq!(
            c.api_url(&["incidentes"]).unwrap().as_str(),
            "https://api.example.edu/dev/incidentes"
        );
    }

    #[test]
    fn api_url_encodes_ids_as_one_segment() {
        let c = client("https://api.example.edu/dev");
        let url = c.api_url(&["incidentes", "a/b?c#d", "asignar"]).unwrap();
        assert_eq!(url.path(), "/dev/incidentes/a%2Fb%3Fc%23d/asignar");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"not yours","message":"x"}"#).as_deref(),
            Some("not yours")
        );
        assert_eq!(
            error_message(r#"{"message":"Unsupported route"}"#).as_deref(),
            Some("Unsupported route")
        );
        assert!(error_message("<html>").is_none());
    }
}
