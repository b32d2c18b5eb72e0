// ── State reconciliation ──
//
// Push events only say "something changed". The reconciler answers by
// re-fetching the full list and replacing the snapshot, never patching.
// Each request issues its own fetch unless a coalescing window is set.

pub mod view;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use campus_api::{Incident, IncidentClient};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::store::ListStore;

pub use view::{Filters, ListBody, ListView, ResolvedGroup, Tab, ViewState, WorkerLoad, worker_loads};

/// Where the authoritative incident list comes from.
pub trait IncidentSource: Send + Sync {
    fn fetch_incidents(&self) -> BoxFuture<'_, Result<Vec<Incident>, CoreError>>;
}

impl IncidentSource for IncidentClient {
    fn fetch_incidents(&self) -> BoxFuture<'_, Result<Vec<Incident>, CoreError>> {
        async move { self.list_incidents().await.map_err(CoreError::from) }.boxed()
    }
}

/// Why a refresh was requested, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RefreshReason {
    Startup,
    StateChange,
    CreationNotice,
    Mutation,
    Manual,
}

/// Issues list re-fetches into a [`ListStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn IncidentSource>,
    store: ListStore,
    coalesce: Option<Duration>,
    coalescing: AtomicBool,
    fetches: AtomicU64,
    shutdown: CancellationToken,
}

impl Reconciler {
    /// `coalesce`: when set, requests arriving within the window after a
    /// first one are merged into a single fetch.
    pub fn new(source: Arc<dyn IncidentSource>, store: ListStore, coalesce: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                coalesce,
                coalescing: AtomicBool::new(false),
                fetches: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn store(&self) -> &ListStore {
        &self.inner.store
    }

    /// Request a re-fetch. Returns immediately; the fetch runs on a
    /// spawned task and its result replaces the snapshot on completion.
    pub fn request(&self, reason: RefreshReason) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        let Some(window) = self.inner.coalesce else {
            self.spawn_fetch(reason);
            return;
        };

        if self.inner.coalescing.swap(true, Ordering::SeqCst) {
            debug!(%reason, "refresh merged into pending fetch");
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                () = inner.shutdown.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    inner.coalescing.store(false, Ordering::SeqCst);
                    fetch(&inner, reason).await;
                }
            }
        });
    }

    /// Request a re-fetch after `delay`.
    pub fn request_after(&self, delay: Duration, reason: RefreshReason) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = this.inner.shutdown.cancelled() => {}
                () = tokio::time::sleep(delay) => this.request(reason),
            }
        });
    }

    /// Fetch inline and wait for the result.
    pub async fn refresh_now(&self, reason: RefreshReason) -> Result<(), CoreError> {
        fetch(&self.inner, reason).await
    }

    /// Drop pending delayed requests. In-flight fetches still complete.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    fn spawn_fetch(&self, reason: RefreshReason) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // Errors are already recorded in the store.
            let _ = fetch(&inner, reason).await;
        });
    }
}

async fn fetch(inner: &Inner, reason: RefreshReason) -> Result<(), CoreError> {
    let seq = inner.fetches.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(%reason, fetch = seq, "re-fetching incident list");
    inner.store.begin_fetch();

    match inner.source.fetch_incidents().await {
        Ok(incidents) => {
            info!(%reason, fetch = seq, count = incidents.len(), "incident list refreshed");
            inner.store.apply_snapshot(incidents);
            Ok(())
        }
        Err(e) => {
            warn!(%reason, fetch = seq, error = %e, "incident list refresh failed");
            inner.store.apply_error(e.to_string());
            Err(e)
        }
    }
}
