// ── Notification presentation ──
//
// Turns state-change events into toasts, native desktop notifications and
// a bounded, persisted history.

pub mod desktop;
pub mod history;
pub mod presenter;
pub mod view;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use desktop::{DesktopNotifier, Permission};
pub use history::{HISTORY_CAP, HISTORY_KEY, HistoryEntry, HistoryStore, JsonFileHistory, MemoryHistory};
pub use presenter::{Presenter, PresenterConfig, Toast, ToastId, ToastPhase};
pub use view::{OverlayView, ToastView, render};

/// Visual kind of a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Warning => "⚠",
            Self::Success => "✔",
            Self::Error => "✖",
        }
    }
}

/// Maps an incident's new state to a notification kind.
///
/// Lookups are case-insensitive; unmapped states are [`Severity::Info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityTable {
    entries: HashMap<String, Severity>,
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::from_pairs([
            ("pendiente", Severity::Info),
            ("asignado", Severity::Warning),
            ("en atención", Severity::Warning),
            ("completado", Severity::Success),
            ("resuelto", Severity::Success),
        ])
    }
}

impl SeverityTable {
    pub fn from_pairs<S: AsRef<str>>(pairs: impl IntoIterator<Item = (S, Severity)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(state, severity)| (normalize(state.as_ref()), severity))
                .collect(),
        }
    }

    /// Add or replace a mapping.
    pub fn set(&mut self, state: &str, severity: Severity) {
        self.entries.insert(normalize(state), severity);
    }

    pub fn classify(&self, state: &str) -> Severity {
        self.entries
            .get(&normalize(state))
            .copied()
            .unwrap_or_default()
    }
}

fn normalize(state: &str) -> String {
    state.trim().to_lowercase()
}

/// A notification as shown to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: Severity,
    pub title: String,
    pub body: String,
    /// Incident the notification is about, for "view details".
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
}
