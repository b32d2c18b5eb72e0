// ── Inbound frame parsing ──
//
// Frames are JSON objects discriminated by `action`. Parsing never fails
// loudly: anything unusable comes back as a `Frame` variant the dispatcher
// logs and drops.

use campus_api::Incident;
use serde_json::{Map, Value};

/// Discriminant for a status transition.
pub const ACTION_STATE_CHANGE: &str = "estado_change";

/// Discriminant for a newly reported incident.
pub const ACTION_CREATED: &str = "new_incidente";

/// An incident moved from one state to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub incident_id: String,
    pub title: Option<String>,
    pub old_state: Option<String>,
    pub new_state: String,
    /// Human-readable message composed by the server.
    pub message: Option<String>,
    /// Server timestamp, verbatim.
    pub timestamp: Option<String>,
}

impl StateChange {
    /// Message to show, composing one from the states when the server
    /// sent none.
    pub fn display_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_owned();
        }
        let title = self.title.as_deref().unwrap_or(&self.incident_id);
        match self.old_state.as_deref() {
            Some(old) => format!("\"{title}\" changed from {old} to {}", self.new_state),
            None => format!("\"{title}\" is now {}", self.new_state),
        }
    }
}

/// A new incident was reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationNotice {
    /// The record as pushed by the server, if it parsed.
    pub item: Option<Incident>,
}

/// A well-formed frame, classified by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    StateChange(StateChange),
    CreationNotice(CreationNotice),
    Unrecognized { action: Option<String> },
}

/// Result of parsing one raw frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Not JSON at all.
    Opaque,
    /// Known kind, but a required field is missing or unusable.
    Incomplete { action: &'static str, missing: &'static str },
    Event(InboundEvent),
}

/// Classify a raw text frame.
pub fn parse_frame(raw: &str) -> Frame {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return Frame::Opaque;
    };
    let Value::Object(fields) = value else {
        return Frame::Event(InboundEvent::Unrecognized { action: None });
    };

    match fields.get("action").and_then(Value::as_str) {
        Some(ACTION_STATE_CHANGE) => parse_state_change(&fields),
        Some(ACTION_CREATED) => Frame::Event(InboundEvent::CreationNotice(CreationNotice {
            item: fields
                .get("item")
                .and_then(|item| serde_json::from_value(item.clone()).ok()),
        })),
        other => Frame::Event(InboundEvent::Unrecognized {
            action: other.map(str::to_owned),
        }),
    }
}

fn parse_state_change(fields: &Map<String, Value>) -> Frame {
    let Some(incident_id) = fields.get("incidente_id").and_then(id_text) else {
        return Frame::Incomplete {
            action: ACTION_STATE_CHANGE,
            missing: "incidente_id",
        };
    };
    let Some(new_state) = text(fields, "new_estado") else {
        return Frame::Incomplete {
            action: ACTION_STATE_CHANGE,
            missing: "new_estado",
        };
    };

    Frame::Event(InboundEvent::StateChange(StateChange {
        incident_id,
        title: text(fields, "titulo"),
        old_state: text(fields, "old_estado"),
        new_state,
        message: text(fields, "mensaje"),
        timestamp: text(fields, "timestamp"),
    }))
}

/// Non-empty string field.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

/// Ids arrive as strings or numbers.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
