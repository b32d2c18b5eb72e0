// ── Reactive list snapshot ──
//
// Every fetch completion replaces the snapshot (or records an error) and
// publishes the new state over a watch channel. The most recently
// completed fetch wins, regardless of which started first.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use campus_api::Incident;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

/// An immutable incident list as returned by one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Newest first; undated records last.
    pub incidents: Vec<Incident>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot, sorting newest first by creation time.
    pub fn new(mut incidents: Vec<Incident>, fetched_at: DateTime<Utc>) -> Self {
        // Stable sort keeps server order among equal or missing dates.
        incidents.sort_by(|a, b| b.created_time().cmp(&a.created_time()));
        Self {
            incidents,
            fetched_at,
        }
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

/// What the list view currently has to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    /// Last successful fetch, if any.
    pub snapshot: Option<Arc<Snapshot>>,
    /// Error from the most recent fetch, cleared by the next success.
    pub error: Option<String>,
    /// At least one fetch is in flight.
    pub loading: bool,
    /// Bumped on every completed fetch.
    pub version: u64,
}

/// Shared handle to the list state. Cheap to clone.
#[derive(Clone)]
pub struct ListStore {
    state: Arc<watch::Sender<ListState>>,
    in_flight: Arc<AtomicUsize>,
}

impl Default for ListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            state: Arc::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// Mark a fetch as started.
    pub(crate) fn begin_fetch(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| {
            let changed = !state.loading;
            state.loading = true;
            changed
        });
    }

    /// Replace the snapshot with a fresh fetch result.
    pub(crate) fn apply_snapshot(&self, incidents: Vec<Incident>) {
        let snapshot = Arc::new(Snapshot::new(incidents, Utc::now()));
        debug!(count = snapshot.len(), "incident list replaced");
        self.finish(|state| {
            state.snapshot = Some(snapshot);
            state.error = None;
        });
    }

    /// Record a failed fetch. The previous snapshot stays visible.
    pub(crate) fn apply_error(&self, message: String) {
        self.finish(|state| state.error = Some(message));
    }

    fn finish(&self, apply: impl FnOnce(&mut ListState)) {
        let remaining = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .map_or(0, |previous| previous.saturating_sub(1));
        self.state.send_modify(|state| {
            apply(state);
            state.loading = remaining > 0;
            state.version += 1;
        });
    }
}
