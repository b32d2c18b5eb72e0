// ── Notification history ──
//
// Newest-first list of past state changes, capped at HISTORY_CAP and
// persisted under the `notifications` key of a small JSON key-value file.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoreError;
use crate::event::StateChange;

/// Maximum retained history entries.
pub const HISTORY_CAP: usize = 50;

/// Storage key the history lives under.
pub const HISTORY_KEY: &str = "notifications";

/// One past state change, in the persisted wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "incidente_id")]
    pub incident_id: String,
    #[serde(rename = "titulo", default)]
    pub title: Option<String>,
    #[serde(rename = "old_estado", default)]
    pub old_state: Option<String>,
    #[serde(rename = "new_estado")]
    pub new_state: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<&StateChange> for HistoryEntry {
    fn from(change: &StateChange) -> Self {
        Self {
            incident_id: change.incident_id.clone(),
            title: change.title.clone(),
            old_state: change.old_state.clone(),
            new_state: change.new_state.clone(),
            timestamp: change.timestamp.clone(),
        }
    }
}

/// Durable backing for the history list.
pub trait HistoryStore: Send + Sync {
    /// Stored entries, newest first. A missing store is an empty list.
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError>;

    /// Replace the stored list.
    fn save(&self, entries: &[HistoryEntry]) -> Result<(), CoreError>;
}

/// In-memory history, bounded and newest first.
#[derive(Debug, Clone, Default)]
pub(crate) struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub(crate) fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut entries = VecDeque::from(entries);
        entries.truncate(HISTORY_CAP);
        Self { entries }
    }

    /// Prepend `entry`, evicting the oldest beyond the cap.
    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAP);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

// ── JSON file store ──────────────────────────────────────────────────

/// History persisted in a JSON object file under [`HISTORY_KEY`].
///
/// Other keys in the file are preserved on save.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(history_error(&self.path, &e)),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CoreError::History {
                message: format!("{} is not a JSON object", self.path.display()),
            }),
            Err(e) => Err(history_error(&self.path, &e)),
        }
    }
}

impl HistoryStore for JsonFileHistory {
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError> {
        let mut map = self.read_map()?;
        let Some(value) = map.remove(HISTORY_KEY) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<HistoryEntry> =
            serde_json::from_value(value).map_err(|e| history_error(&self.path, &e))?;
        entries.truncate(HISTORY_CAP);
        debug!(count = entries.len(), path = %self.path.display(), "loaded notification history");
        Ok(entries)
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), CoreError> {
        // Unreadable files are replaced rather than blocking new history.
        let mut map = self.read_map().unwrap_or_default();
        let value = serde_json::to_value(entries).map_err(|e| history_error(&self.path, &e))?;
        map.insert(HISTORY_KEY.to_owned(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| history_error(parent, &e))?;
        }
        let serialized = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| history_error(&self.path, &e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized).map_err(|e| history_error(&tmp, &e))?;
        fs::rename(&tmp, &self.path).map_err(|e| history_error(&self.path, &e))?;
        Ok(())
    }
}

fn history_error(path: &Path, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::History {
        message: format!("{}: {err}", path.display()),
    }
}

// ── Memory store ─────────────────────────────────────────────────────

/// Volatile store for tests and one-shot commands.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| CoreError::Internal("history lock poisoned".into()))
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), CoreError> {
        let mut stored = self
            .entries
            .lock()
            .map_err(|_| CoreError::Internal("history lock poisoned".into()))?;
        *stored = entries.to_vec();
        Ok(())
    }
}
