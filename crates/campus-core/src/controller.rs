// ── Controller ──
//
// Context object for one viewer session. Owns the incident client, the
// connection manager, presenter, list store and reconciler, and wires
// frames from the socket through the dispatcher.

use std::sync::Arc;

use campus_api::websocket::{ConnectionManager, ConnectionState, Transport, TungsteniteTransport};
use campus_api::{Incident, IncidentClient, IncidentDraft, IncidentPatch};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::notify::{DesktopNotifier, HistoryEntry, HistoryStore, Presenter, Toast, ToastId};
use crate::reconcile::{
    Filters, IncidentSource, ListView, Reconciler, RefreshReason, Tab, ViewState, WorkerLoad,
    worker_loads,
};
use crate::store::{ListState, ListStore};

/// The main entry point for consumers.
///
/// Cheaply cloneable. Create with [`Controller::new`], then call
/// [`start()`](Self::start) to open the notification channel and load the
/// list. A stopped controller cannot be restarted.
pub struct Controller<T: Transport = TungsteniteTransport> {
    inner: Arc<ControllerInner<T>>,
}

impl<T: Transport> Clone for Controller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<T: Transport> {
    config: ClientConfig,
    client: IncidentClient,
    connection: ConnectionManager<T>,
    presenter: Presenter,
    reconciler: Reconciler,
    view: watch::Sender<ViewState>,
    frames: Mutex<Option<mpsc::Receiver<String>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Controller<TungsteniteTransport> {
    /// Create a controller using the real websocket transport.
    pub fn new(
        config: ClientConfig,
        history: Arc<dyn HistoryStore>,
        desktop: Option<Arc<dyn DesktopNotifier>>,
    ) -> Result<Self, CoreError> {
        Self::with_transport(config, TungsteniteTransport, history, desktop)
    }
}

impl<T: Transport> Controller<T> {
    /// Create a controller over a custom socket transport. Does not
    /// connect.
    pub fn with_transport(
        config: ClientConfig,
        transport: T,
        history: Arc<dyn HistoryStore>,
        desktop: Option<Arc<dyn DesktopNotifier>>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let client = IncidentClient::new(config.api_url.clone(), &config.identity, &config.transport)?;
        let (connection, frames) =
            ConnectionManager::new(config.ws_url.clone(), config.reconnect.clone(), transport);
        let presenter = Presenter::new(config.presenter.clone(), history, desktop);
        let source: Arc<dyn IncidentSource> = Arc::new(client.clone());
        let reconciler = Reconciler::new(source, ListStore::new(), config.coalesce_window);
        let (view, _) = watch::channel(ViewState::default());

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                connection,
                presenter,
                reconciler,
                view,
                frames: Mutex::new(Some(frames)),
                dispatcher: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &IncidentClient {
        &self.inner.client
    }

    pub fn presenter(&self) -> &Presenter {
        &self.inner.presenter
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start dispatching, open the notification channel and request the
    /// initial list.
    ///
    /// Never fails on network problems: the channel retries on its own and
    /// fetch errors land in the list state.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Internal("controller was stopped".into()));
        }

        if let Some(frames) = self.inner.frames.lock().await.take() {
            let reconciler = self.inner.reconciler.clone();
            let dispatcher = Dispatcher::new(
                self.inner.presenter.clone(),
                self.inner.reconciler.clone(),
                self.inner.config.settle_delay,
            )
            .on_creation(move |_| reconciler.request(RefreshReason::CreationNotice));

            let handle = tokio::spawn(dispatcher.run(frames, self.inner.cancel.child_token()));
            *self.inner.dispatcher.lock().await = Some(handle);
        }

        info!(identity = %self.inner.config.identity, "starting notification session");
        self.inner.connection.connect(&self.inner.config.identity).await;
        self.inner.reconciler.request(RefreshReason::Startup);
        Ok(())
    }

    /// Close the channel deliberately and stop all background work.
    pub async fn stop(&self) {
        self.inner.connection.disconnect().await;
        self.inner.cancel.cancel();
        self.inner.presenter.shutdown();
        self.inner.reconciler.shutdown();

        if let Some(handle) = self.inner.dispatcher.lock().await.take() {
            let _ = handle.await;
        }
        debug!("notification session stopped");
    }

    /// Manual retry after terminal failure.
    pub async fn reconnect(&self) -> bool {
        self.inner.connection.reconnect().await
    }

    /// Fetch the list now and wait for the result.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.inner.reconciler.refresh_now(RefreshReason::Manual).await
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state()
    }

    pub fn current_connection_state(&self) -> ConnectionState {
        self.inner.connection.current_state()
    }

    pub fn toasts(&self) -> watch::Receiver<Arc<Vec<Toast>>> {
        self.inner.presenter.toasts()
    }

    pub fn list(&self) -> watch::Receiver<ListState> {
        self.inner.reconciler.store().subscribe()
    }

    pub fn view_state(&self) -> watch::Receiver<ViewState> {
        self.inner.view.subscribe()
    }

    /// Build the list view from the current snapshot and view state.
    pub fn list_view(&self) -> ListView {
        let state = self.inner.reconciler.store().current();
        ListView::build(&state, &self.inner.view.borrow())
    }

    pub fn set_filters(&self, filters: Filters) {
        self.inner.view.send_modify(|view| view.filters = filters);
    }

    pub fn set_tab(&self, tab: Tab) {
        self.inner.view.send_modify(|view| view.tab = tab);
    }

    pub fn dismiss(&self, id: ToastId) -> bool {
        self.inner.presenter.dismiss(id)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.presenter.history()
    }

    pub fn clear_history(&self) -> Result<(), CoreError> {
        self.inner.presenter.clear_history()
    }

    // ── Incident operations ──────────────────────────────────────
    //
    // Every mutation is followed by a full re-fetch. Create and complete
    // wait briefly first, since the server applies them asynchronously.

    pub async fn create_incident(&self, draft: &IncidentDraft) -> Result<Incident, CoreError> {
        if draft.title.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "title is required".into(),
            });
        }
        let created = self.inner.client.create_incident(draft).await?;
        self.refresh_after_mutation(true);
        Ok(created)
    }

    pub async fn update_incident(&self, id: &str, patch: &IncidentPatch) -> Result<(), CoreError> {
        if patch.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "nothing to update".into(),
            });
        }
        self.inner.client.update_incident(id, patch).await?;
        self.refresh_after_mutation(false);
        Ok(())
    }

    pub async fn assign_incident(&self, id: &str, worker_email: &str) -> Result<(), CoreError> {
        self.inner.client.assign_incident(id, worker_email).await?;
        self.refresh_after_mutation(false);
        Ok(())
    }

    pub async fn complete_incident(&self, id: &str) -> Result<(), CoreError> {
        self.inner.client.complete_incident(id).await?;
        self.refresh_after_mutation(true);
        Ok(())
    }

    /// Workers with their open assignment counts from the current list.
    pub async fn workers(&self) -> Result<Vec<WorkerLoad>, CoreError> {
        let workers = self.inner.client.list_workers().await?;
        let state = self.inner.reconciler.store().current();
        let incidents = state
            .snapshot
            .as_ref()
            .map_or(&[][..], |s| s.incidents.as_slice());
        Ok(worker_loads(workers, incidents))
    }

    fn refresh_after_mutation(&self, delayed: bool) {
        if delayed {
            self.inner.reconciler.request_after(
                self.inner.config.mutation_refresh_delay,
                RefreshReason::Mutation,
            );
        } else {
            self.inner.reconciler.request(RefreshReason::Mutation);
        }
    }
}
