// Wire types for the incident API.
//
// Field names on the wire are the server's (Spanish, mixed case); the Rust
// side uses English names with serde renames.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// State value the server uses for finished incidents.
pub const RESOLVED_STATE: &str = "resuelto";

/// State value the server uses for closed (archived) incidents.
pub const CLOSED_STATE: &str = "cerrado";

/// An incident record as returned by `GET /incidentes`.
///
/// Unknown fields are kept in `extra` so nothing the server sends is lost
/// when a record is re-serialized (e.g. `--output json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(rename = "titulo", default, deserialize_with = "lenient_text")]
    pub title: Option<String>,

    #[serde(rename = "descripcion", default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    /// Free-form category (`tipo`), used to build the category filter.
    #[serde(rename = "tipo", default, deserialize_with = "lenient_text")]
    pub category: Option<String>,

    #[serde(rename = "piso", default, deserialize_with = "lenient_text")]
    pub floor: Option<String>,

    #[serde(rename = "lugar_especifico", default, deserialize_with = "lenient_text")]
    pub location: Option<String>,

    #[serde(rename = "foto", default, deserialize_with = "lenient_text")]
    pub photo: Option<String>,

    /// Risk level (`bajo`, `medio`, `alto`, ...).
    #[serde(rename = "Nivel_Riesgo", default, deserialize_with = "lenient_text")]
    pub severity: Option<String>,

    #[serde(rename = "estado", default, deserialize_with = "lenient_text")]
    pub status: Option<String>,

    #[serde(rename = "Fecha_creacion", default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,

    #[serde(rename = "fecha_completado", default, deserialize_with = "lenient_text")]
    pub completed_at: Option<String>,

    /// Email of the assigned worker.
    #[serde(rename = "asignado_a", default, deserialize_with = "lenient_text")]
    pub assigned_to: Option<String>,

    #[serde(rename = "asignado_a_nombre", default, deserialize_with = "lenient_text")]
    pub assigned_to_name: Option<String>,

    #[serde(rename = "asignado_a_especialidad", default, deserialize_with = "lenient_text")]
    pub assigned_to_specialty: Option<String>,

    #[serde(rename = "creado_por_nombre", default, deserialize_with = "lenient_text")]
    pub created_by_name: Option<String>,

    /// DynamoDB numbers come back stringified (`"0"`); both forms are accepted.
    #[serde(rename = "veces_reportado", default, deserialize_with = "lenient_count")]
    pub report_count: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Incident {
    /// Minimal record with only an id, mostly useful in tests.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            category: None,
            floor: None,
            location: None,
            photo: None,
            severity: None,
            status: None,
            created_at: None,
            timestamp: None,
            completed_at: None,
            assigned_to: None,
            assigned_to_name: None,
            assigned_to_specialty: None,
            created_by_name: None,
            report_count: None,
            extra: Map::new(),
        }
    }

    /// Current state, defaulting to `pendiente` when the server omits it.
    pub fn status_or_default(&self) -> &str {
        self.status.as_deref().unwrap_or("pendiente")
    }

    pub fn is_resolved(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(RESOLVED_STATE))
    }

    /// Neither resolved nor closed: still occupies the assigned worker.
    pub fn is_open(&self) -> bool {
        !self.is_resolved()
            && !self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(CLOSED_STATE))
    }

    /// Creation time, falling back to the generic `timestamp` field.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.timestamp.as_deref().and_then(parse_timestamp))
    }

    /// Day the incident was completed, falling back to its creation day.
    pub fn completed_date(&self) -> Option<NaiveDate> {
        self.completed_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.created_at.as_deref().and_then(parse_timestamp))
            .map(|t| t.date_naive())
    }
}

/// Parse the timestamp formats the server emits.
///
/// Accepts RFC 3339, naive ISO-8601 (Python `isoformat()` output, taken as
/// UTC), and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Deserialize an id that may arrive as a JSON string or number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Optional text that some records carry as a number or bool.
///
/// Anything that is not a scalar reads as absent so one odd field never
/// rejects the whole record.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// Optional count given as a number or a numeric string.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => parse_count(&s),
        _ => None,
    })
}

/// `Decimal` renders integers as `"3"` but can also produce `"3.0"`.
fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let whole = match raw.split_once('.') {
        Some((whole, frac)) if frac.bytes().all(|b| b == b'0') => whole,
        Some(_) => return None,
        None => raw,
    };
    whole.parse().ok()
}

/// Decode records one by one, dropping those that do not fit `T`.
///
/// A single malformed record (missing `id`, say) is logged and skipped
/// instead of failing the whole list.
pub fn decode_records<T: DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

// ── List envelopes ───────────────────────────────────────────────────

/// The response shapes `GET /incidentes` is known to produce.
///
/// Deployments have returned a bare array, an `{incidents: [...]}` wrapper,
/// and the raw DynamoDB scan shape `{Items: [...]}`. Anything else is a
/// deserialization error rather than an empty list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Incidents {
        incidents: Vec<T>,
    },
    Items {
        #[serde(rename = "Items")]
        items: Vec<T>,
    },
}

impl<T> ListEnvelope<T> {
    /// Normalize to the contained records.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Incidents { incidents: items } | Self::Items { items } => {
                items
            }
        }
    }
}

// ── Request bodies ───────────────────────────────────────────────────

/// Body for `POST /incidentes`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncidentDraft {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "tipo")]
    pub category: String,
    #[serde(rename = "piso")]
    pub floor: String,
    #[serde(rename = "lugar_especifico")]
    pub location: String,
    #[serde(rename = "foto")]
    pub photo: String,
    #[serde(rename = "Nivel_Riesgo")]
    pub severity: String,
}

/// Body for `PUT /incidentes/{id}`. Only set fields are sent.
///
/// State is not editable here; it changes through assign/complete.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncidentPatch {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "tipo", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "Nivel_Riesgo", skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl IncidentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.severity.is_none()
    }
}

/// Body for `PUT /incidentes/{id}/asignar`.
#[derive(Debug, Clone, Serialize)]
pub struct AssignRequest {
    pub trabajador_email: String,
}

/// A worker as returned by `GET /users?tipo=trabajador`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub email: String,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "especialidad", default)]
    pub specialty: Option<String>,
    #[serde(rename = "tipo", default)]
    pub role: Option<String>,
}
