// campus-api: Async client for the campus incident API (HTTP + realtime socket)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::IncidentClient;
pub use error::Error;
pub use models::{AssignRequest, Incident, IncidentDraft, IncidentPatch, ListEnvelope, Worker};
