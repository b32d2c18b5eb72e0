// ── Connection manager ──
//
// Owns at most one realtime channel at a time. A background task runs the
// open/read/reconnect loop; deliberate disconnects go through a
// CancellationToken so they never schedule a reconnect.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::policy::ReconnectConfig;
use super::transport::{Connection, Transport, TungsteniteTransport, endpoint_url};
use crate::error::Error;

/// Buffered frames between the socket reader and the consumer.
const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// Lifecycle of the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel and none wanted.
    Idle,
    /// Opening a channel. `attempt` is 0 for the first try after `connect`.
    Connecting { attempt: u32 },
    /// Channel is open and delivering frames.
    Open,
    /// Deliberate shutdown in progress.
    Closing,
    /// Waiting `delay` before reconnection attempt `attempt`.
    ReconnectPending { attempt: u32, delay: Duration },
    /// Retry ceiling reached; nothing further is scheduled.
    Failed { attempts: u32 },
}

impl ConnectionState {
    /// Human-readable status line.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle | Self::Closing => "Disconnected",
            Self::Connecting { .. } => "Connecting…",
            Self::Open => "Notifications active",
            Self::ReconnectPending { .. } => "Reconnecting…",
            Self::Failed { .. } => "Could not connect",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Current reconnection attempt counter.
    pub fn attempt(&self) -> u32 {
        match self {
            Self::Connecting { attempt } | Self::ReconnectPending { attempt, .. } => *attempt,
            Self::Failed { attempts } => *attempts,
            Self::Idle | Self::Open | Self::Closing => 0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct ActiveChannel {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Maintains the realtime notification channel for one viewer identity.
///
/// Frames are forwarded, in arrival order, to the receiver returned by
/// [`ConnectionManager::new`].
pub struct ConnectionManager<T: Transport = TungsteniteTransport> {
    endpoint: String,
    reconnect: ReconnectConfig,
    transport: Arc<T>,
    frames: mpsc::Sender<String>,
    state: Arc<watch::Sender<ConnectionState>>,
    active: Mutex<Option<ActiveChannel>>,
    identity: Mutex<Option<String>>,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create an idle manager for the channel at `endpoint` (a `ws://` or
    /// `wss://` base address). Returns the frame receiver alongside it.
    pub fn new(
        endpoint: impl Into<String>,
        reconnect: ReconnectConfig,
        transport: T,
    ) -> (Self, mpsc::Receiver<String>) {
        let (frames, frames_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Idle);
        let manager = Self {
            endpoint: endpoint.into(),
            reconnect,
            transport: Arc::new(transport),
            frames,
            state: Arc::new(state),
            active: Mutex::new(None),
            identity: Mutex::new(None),
        };
        (manager, frames_rx)
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current connection state.
    pub fn current_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Open the channel for `identity`, replacing any active one.
    ///
    /// Never fails: an unreachable or malformed endpoint is handled as an
    /// unexpected closure and goes through the reconnect policy.
    pub async fn connect(&self, identity: &str) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!("replacing active notification channel");
            shut_down(previous).await;
        }
        *self.identity.lock().await = Some(identity.to_owned());

        let cancel = CancellationToken::new();
        let worker = ChannelWorker {
            endpoint: self.endpoint.clone(),
            identity: identity.to_owned(),
            reconnect: self.reconnect.clone(),
            transport: Arc::clone(&self.transport),
            frames: self.frames.clone(),
            state: Arc::clone(&self.state),
        };
        let task = tokio::spawn(worker.run(cancel.clone()));
        *active = Some(ActiveChannel { cancel, task });
    }

    /// Close the channel deliberately. No reconnect is scheduled.
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;
        if let Some(channel) = active.take() {
            shut_down(channel).await;
        }
        // A task that already hit the ceiling left `Failed` behind.
        if !matches!(*self.state.borrow(), ConnectionState::Idle) {
            publish(&self.state, ConnectionState::Idle);
        }
    }

    /// Manual retry with the last identity, typically after `Failed`.
    ///
    /// Returns `false` when `connect` has never been called.
    pub async fn reconnect(&self) -> bool {
        let identity = self.identity.lock().await.clone();
        match identity {
            Some(identity) => {
                info!("manual reconnect requested");
                self.connect(&identity).await;
                true
            }
            None => {
                warn!("manual reconnect requested before any connect");
                false
            }
        }
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        if let Some(channel) = self.active.get_mut().take() {
            channel.cancel.cancel();
        }
    }
}

async fn shut_down(channel: ActiveChannel) {
    channel.cancel.cancel();
    if let Err(e) = channel.task.await {
        warn!(error = %e, "notification channel task ended abnormally");
    }
}

fn publish(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    match &next {
        ConnectionState::ReconnectPending { attempt, delay } => {
            info!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                status = %next,
                "reconnect scheduled"
            );
        }
        ConnectionState::Failed { attempts } => {
            error!(attempts, status = %next, "giving up on notification channel");
        }
        _ => info!(status = %next, "notification channel state changed"),
    }
    state.send_replace(next);
}

/// Why a read loop ended.
enum Closure {
    Deliberate,
    Unexpected(Error),
}

/// Everything the background task needs, detached from the manager.
struct ChannelWorker<T: Transport> {
    endpoint: String,
    identity: String,
    reconnect: ReconnectConfig,
    transport: Arc<T>,
    frames: mpsc::Sender<String>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl<T: Transport> ChannelWorker<T> {
    async fn run(self, cancel: CancellationToken) {
        let mut attempt: u32 = 0;

        loop {
            publish(&self.state, ConnectionState::Connecting { attempt });

            let opened = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.open() => result,
            };

            match opened {
                Ok(mut conn) => {
                    attempt = 0;
                    publish(&self.state, ConnectionState::Open);

                    match self.read_until_closed(&mut conn, &cancel).await {
                        Closure::Deliberate => {
                            publish(&self.state, ConnectionState::Closing);
                            conn.close().await;
                            break;
                        }
                        Closure::Unexpected(e) => {
                            warn!(
                                error = %e,
                                transient = e.is_transient(),
                                "notification channel closed unexpectedly"
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        transient = e.is_transient(),
                        attempt,
                        "could not open notification channel"
                    );
                }
            }

            let next = attempt.saturating_add(1);
            if !self.reconnect.allows(next) {
                publish(&self.state, ConnectionState::Failed { attempts: attempt });
                return;
            }
            attempt = next;
            let delay = self.reconnect.delay_for(attempt);
            publish(&self.state, ConnectionState::ReconnectPending { attempt, delay });

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        publish(&self.state, ConnectionState::Idle);
    }

    async fn open(&self) -> Result<T::Conn, Error> {
        let url = endpoint_url(&self.endpoint, &self.identity)?;
        self.transport.open(&url).await
    }

    async fn read_until_closed(&self, conn: &mut T::Conn, cancel: &CancellationToken) -> Closure {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Closure::Deliberate,
                frame = conn.next_text() => match frame {
                    Some(Ok(text)) => {
                        if self.frames.send(text).await.is_err() {
                            debug!("frame receiver dropped");
                        }
                    }
                    Some(Err(e)) => return Closure::Unexpected(e),
                    None => {
                        return Closure::Unexpected(Error::WebSocketClosed {
                            code: 1006,
                            reason: "stream ended".into(),
                        });
                    }
                },
            }
        }
    }
}
