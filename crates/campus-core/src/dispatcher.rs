// ── Frame dispatcher ──
//
// Routes parsed frames: state changes go to the presenter right away and
// to the reconciler after a settle delay; creation notices go to an
// optional hook. Everything else is logged and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::event::{CreationNotice, Frame, InboundEvent, parse_frame};
use crate::notify::Presenter;
use crate::reconcile::{Reconciler, RefreshReason};

/// Callback for `new_incidente` frames.
pub type CreationHook = Box<dyn Fn(&CreationNotice) + Send + Sync>;

/// Longest frame excerpt written to logs.
const LOG_EXCERPT: usize = 120;

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Opaque,
    Incomplete,
    Unrecognized,
    StateChange,
    CreationNotice { hooked: bool },
}

pub struct Dispatcher {
    presenter: Presenter,
    reconciler: Reconciler,
    settle_delay: Duration,
    on_created: Option<CreationHook>,
}

impl Dispatcher {
    pub fn new(presenter: Presenter, reconciler: Reconciler, settle_delay: Duration) -> Self {
        Self {
            presenter,
            reconciler,
            settle_delay,
            on_created: None,
        }
    }

    /// Register the refresh hook for creation notices.
    pub fn on_creation(mut self, hook: impl Fn(&CreationNotice) + Send + Sync + 'static) -> Self {
        self.on_created = Some(Box::new(hook));
        self
    }

    /// Handle one raw frame. Never panics on bad input.
    pub fn on_frame(&self, raw: &str) -> Routed {
        match parse_frame(raw) {
            Frame::Opaque => {
                debug!(frame = excerpt(raw), "ignoring non-JSON frame");
                Routed::Opaque
            }
            Frame::Incomplete { action, missing } => {
                debug!(action, missing, "ignoring frame with missing field");
                Routed::Incomplete
            }
            Frame::Event(InboundEvent::Unrecognized { action }) => {
                info!(action = action.as_deref().unwrap_or("<none>"), "unhandled message kind");
                Routed::Unrecognized
            }
            Frame::Event(InboundEvent::StateChange(change)) => {
                info!(
                    incidente_id = %change.incident_id,
                    old_estado = change.old_state.as_deref().unwrap_or("?"),
                    new_estado = %change.new_state,
                    "state change received"
                );
                self.presenter.present(&change);
                self.reconciler
                    .request_after(self.settle_delay, RefreshReason::StateChange);
                Routed::StateChange
            }
            Frame::Event(InboundEvent::CreationNotice(notice)) => {
                debug!(
                    id = notice.item.as_ref().map_or("?", |i| i.id.as_str()),
                    "new incident reported"
                );
                match &self.on_created {
                    Some(hook) => {
                        hook(&notice);
                        Routed::CreationNotice { hooked: true }
                    }
                    None => Routed::CreationNotice { hooked: false },
                }
            }
        }
    }

    /// Consume frames in arrival order until the channel closes or
    /// `cancel` fires.
    pub async fn run(self, mut frames: mpsc::Receiver<String>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(raw) => {
                        self.on_frame(&raw);
                    }
                    None => break,
                },
            }
        }
        debug!("dispatcher stopped");
    }
}

fn excerpt(raw: &str) -> &str {
    match raw.char_indices().nth(LOG_EXCERPT) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}
