// campus-core: Realtime notification dispatch, presentation and list reconciliation.

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod notify;
pub mod reconcile;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ClientConfig;
pub use controller::Controller;
pub use dispatcher::{CreationHook, Dispatcher, Routed};
pub use error::CoreError;
pub use event::{CreationNotice, Frame, InboundEvent, StateChange, parse_frame};
pub use notify::{
    DesktopNotifier, HistoryEntry, HistoryStore, JsonFileHistory, MemoryHistory, Notification,
    OverlayView, Permission, Presenter, PresenterConfig, Severity, SeverityTable, Toast, ToastId,
    ToastPhase, render,
};
pub use reconcile::{
    Filters, IncidentSource, ListBody, ListView, Reconciler, RefreshReason, ResolvedGroup, Tab,
    ViewState, WorkerLoad,
};
pub use store::{ListState, ListStore, Snapshot};

// Connection types consumers observe through the controller.
pub use campus_api::websocket::{Backoff, ConnectionState, ReconnectConfig};

// Wire types used by controller operations.
pub use campus_api::{Incident, IncidentDraft, IncidentPatch, Worker};
