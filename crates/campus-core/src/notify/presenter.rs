// ── Notification presenter ──
//
// Owns the toast stack (published over a watch channel), the auto-dismiss
// timers, the bounded history and the optional desktop notifier. Each
// toast's timer is a child of the presenter's shutdown token.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::desktop::{self, DesktopNotifier};
use super::history::{History, HistoryEntry, HistoryStore};
use super::{Notification, SeverityTable};
use crate::error::CoreError;
use crate::event::StateChange;

/// Identifier of a toast within one presenter.
pub type ToastId = u64;

/// Title shown on every state-change toast.
const TOAST_TITLE: &str = "Status updated";

/// Presenter timing and classification.
#[derive(Debug, Clone)]
pub struct PresenterConfig {
    /// How long a toast stays before auto-dismiss. Default: 10s.
    pub toast_lifetime: Duration,
    /// Fade phase between dismissal and removal. Default: 300ms.
    pub fade: Duration,
    pub severity: SeverityTable,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            toast_lifetime: Duration::from_secs(10),
            fade: Duration::from_millis(300),
            severity: SeverityTable::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Visible,
    /// Dismissed; detached once the fade elapses.
    Fading,
}

/// A notification currently on the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub notification: Notification,
    pub phase: ToastPhase,
}

/// Presents state changes as toasts, desktop notifications and history.
///
/// Cheap to clone; clones share the same overlay and history. Must be used
/// from within a tokio runtime, since timers run on spawned tasks.
#[derive(Clone)]
pub struct Presenter {
    inner: Arc<Inner>,
}

struct Inner {
    config: PresenterConfig,
    toasts: watch::Sender<Arc<Vec<Toast>>>,
    timers: Mutex<HashMap<ToastId, CancellationToken>>,
    next_id: AtomicU64,
    history: Mutex<History>,
    store: Arc<dyn HistoryStore>,
    desktop: Option<Arc<dyn DesktopNotifier>>,
    shutdown: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Presenter {
    /// Create a presenter, loading persisted history from `store`.
    ///
    /// An unreadable store starts with empty history.
    pub fn new(
        config: PresenterConfig,
        store: Arc<dyn HistoryStore>,
        desktop: Option<Arc<dyn DesktopNotifier>>,
    ) -> Self {
        let history = match store.load() {
            Ok(entries) => History::from_entries(entries),
            Err(e) => {
                warn!(error = %e, "could not load notification history; starting empty");
                History::default()
            }
        };
        let (toasts, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            inner: Arc::new(Inner {
                config,
                toasts,
                timers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                history: Mutex::new(history),
                store,
                desktop,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.inner.config
    }

    /// Subscribe to the toast stack.
    pub fn toasts(&self) -> watch::Receiver<Arc<Vec<Toast>>> {
        self.inner.toasts.subscribe()
    }

    /// Toasts currently on the overlay, oldest first.
    pub fn visible(&self) -> Arc<Vec<Toast>> {
        Arc::clone(&self.inner.toasts.borrow())
    }

    /// History entries, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.inner.history).to_vec()
    }

    pub fn clear_history(&self) -> Result<(), CoreError> {
        lock(&self.inner.history).clear();
        self.inner.store.save(&[])
    }

    /// Show a state change: toast, desktop notification, history entry.
    pub fn present(&self, change: &StateChange) -> ToastId {
        let kind = self.inner.config.severity.classify(&change.new_state);
        let body = change.display_message();
        let notification = Notification {
            kind,
            title: TOAST_TITLE.to_owned(),
            body: body.clone(),
            subject_id: change.incident_id.clone(),
            created_at: Utc::now(),
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.toasts.send_modify(|list| {
            Arc::make_mut(list).push(Toast {
                id,
                notification,
                phase: ToastPhase::Visible,
            });
        });
        info!(
            incidente_id = %change.incident_id,
            new_estado = %change.new_state,
            kind = %kind,
            toast = id,
            "notification presented"
        );

        self.schedule_auto_dismiss(id);

        if let Some(notifier) = &self.inner.desktop {
            let title = format!(
                "Incident: {}",
                change.title.as_deref().unwrap_or(&change.incident_id)
            );
            desktop::notify(notifier, title, body);
        }

        self.record(HistoryEntry::from(change));
        id
    }

    /// Dismiss a toast before its timer fires.
    ///
    /// Returns `false` if the toast is gone or already fading.
    pub fn dismiss(&self, id: ToastId) -> bool {
        if let Some(timer) = lock(&self.inner.timers).remove(&id) {
            timer.cancel();
        }
        begin_removal(&self.inner, id)
    }

    /// Stop all pending auto-dismiss timers.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        lock(&self.inner.timers).clear();
    }

    fn schedule_auto_dismiss(&self, id: ToastId) {
        let timer = self.inner.shutdown.child_token();
        lock(&self.inner.timers).insert(id, timer.clone());

        let inner = Arc::clone(&self.inner);
        let lifetime = inner.config.toast_lifetime;
        tokio::spawn(async move {
            tokio::select! {
                () = timer.cancelled() => {}
                () = tokio::time::sleep(lifetime) => {
                    lock(&inner.timers).remove(&id);
                    debug!(toast = id, "auto-dismissing toast");
                    begin_removal(&inner, id);
                }
            }
        });
    }

    fn record(&self, entry: HistoryEntry) {
        let snapshot = {
            let mut history = lock(&self.inner.history);
            history.push(entry);
            history.to_vec()
        };
        if let Err(e) = self.inner.store.save(&snapshot) {
            warn!(error = %e, "could not persist notification history");
        }
    }
}

/// Move a visible toast into its fade phase and detach it afterwards.
fn begin_removal(inner: &Arc<Inner>, id: ToastId) -> bool {
    let started = inner.toasts.send_if_modified(|list| {
        let Some(toast) = Arc::make_mut(list)
            .iter_mut()
            .find(|t| t.id == id && t.phase == ToastPhase::Visible)
        else {
            return false;
        };
        toast.phase = ToastPhase::Fading;
        true
    });
    if !started {
        return false;
    }

    let inner = Arc::clone(inner);
    let fade = inner.config.fade;
    tokio::spawn(async move {
        tokio::time::sleep(fade).await;
        inner.toasts.send_if_modified(|list| {
            let before = list.len();
            Arc::make_mut(list).retain(|t| t.id != id);
            list.len() != before
        });
    });
    true
}
