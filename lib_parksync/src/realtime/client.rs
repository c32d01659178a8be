//! # Realtime Sync Client
//!
//! Owns one live-update connection for one mounted view.
//!
//! ## Lifecycle
//! - [`RealtimeSyncClient::start`] spawns a single session task. The task
//!   runs the [`ConnectionState`] machine: connect, pump frames until the
//!   channel drops, wait `reconnect_delay`, connect again. There is no
//!   backoff and no retry cap; it retries for as long as it is started.
//! - [`RealtimeSyncClient::stop`] cancels the session, including a pending
//!   reconnect wait, closes the open transport and waits for the task to
//!   finish. No callback runs after `stop` returns.
//!
//! Frames are handled one at a time in arrival order, so the dedup window
//! and the log see a strictly sequential stream. Each client has its own
//! window and log; two mounted views never share dedup state.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::dedup::{DedupWindow, DEFAULT_DEDUP_WINDOW};
use super::endpoint::ws_url_for_origin;
use super::error::Result;
use super::inbox::{LoggedNotification, NotificationLog, DEFAULT_LOG_CAPACITY};
use super::message::{InboundMessage, NotificationEvent, SpotMap};
use super::reconcile::{Reconciler, Routed};
use super::state::ConnectionState;
use super::transport::{Connector, Frame, Transport, WsConnector};

/// Fixed wait between a dropped connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Tunables for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Wait between a close and the next connection attempt.
    pub reconnect_delay: Duration,
    /// How long an alerted subject stays suppressed.
    pub dedup_window: Duration,
    /// Maximum notification log length.
    pub log_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

type SnapshotCallback = Box<dyn FnMut(SpotMap) + Send>;
type NotificationCallback = Box<dyn FnMut(NotificationEvent) + Send>;

struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Live-update client for one mounted view.
pub struct RealtimeSyncClient {
    url: Url,
    config: SyncConfig,
    connector: Arc<dyn Connector>,
    log: Arc<Mutex<NotificationLog>>,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Option<SessionHandle>,
}

impl RealtimeSyncClient {
    /// Creates a stopped client for `url` using the WebSocket transport.
    pub fn new(url: Url, config: SyncConfig) -> Self {
        Self::with_connector(url, config, Arc::new(WsConnector))
    }

    /// Creates a stopped client for the `/ws` endpoint of a page origin.
    pub fn for_origin(origin: &str, config: SyncConfig) -> Result<Self> {
        Ok(Self::new(ws_url_for_origin(origin)?, config))
    }

    /// Creates a stopped client that opens connections through `connector`.
    pub fn with_connector(url: Url, config: SyncConfig, connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            url,
            config,
            connector,
            log: Arc::new(Mutex::new(NotificationLog::with_capacity(config.log_capacity))),
            state: Arc::new(state),
            session: None,
        }
    }

    /// Starts syncing.
    ///
    /// `on_snapshot` receives every occupancy snapshot unfiltered.
    /// `on_notification` receives each notification that surfaces after
    /// dedup. Both run on the session task. Calling `start` on a started
    /// client does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S, N>(&mut self, on_snapshot: S, on_notification: N)
    where
        S: FnMut(SpotMap) + Send + 'static,
        N: FnMut(NotificationEvent) + Send + 'static,
    {
        if self.session.is_some() {
            log::debug!("Realtime sync for {} already started. Ignoring start.", self.url);
            return;
        }

        let cancel = CancellationToken::new();
        let session = Session {
            url: self.url.clone(),
            reconnect_delay: self.config.reconnect_delay,
            connector: Arc::clone(&self.connector),
            log: Arc::clone(&self.log),
            state: Arc::clone(&self.state),
            reconciler: Reconciler::new(DedupWindow::new(self.config.dedup_window)),
            on_snapshot: Box::new(on_snapshot),
            on_notification: Box::new(on_notification),
            cancel: cancel.clone(),
        };

        let task = tokio::spawn(session.run());
        self.session = Some(SessionHandle { cancel, task });
        log::info!("Realtime sync started for {}", self.url);
    }

    /// Stops syncing and discards the notification log. Idempotent.
    pub async fn stop(&mut self) {
        let Some(handle) = self.session.take() else {
            return;
        };

        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            if e.is_panic() {
                log::error!("Realtime session for {} panicked: {}", self.url, e);
            }
        }

        lock(&self.log).clear();
        self.state.send_replace(ConnectionState::Closed);
        log::info!("Realtime sync stopped for {}", self.url);
    }

    /// Whether a session is running.
    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watches connection state changes, e.g. for a connection badge.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Endpoint this client connects to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Tunables in effect.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Logged notifications, newest first.
    pub fn notifications(&self) -> Vec<LoggedNotification> {
        lock(&self.log).entries()
    }

    /// Unread entries in the log.
    pub fn unread_count(&self) -> usize {
        lock(&self.log).unread_count()
    }

    /// Marks one log entry read locally.
    pub fn mark_read(&self, id: u64) -> bool {
        lock(&self.log).mark_read(id)
    }

    /// Marks every log entry read locally.
    pub fn mark_all_read(&self) -> usize {
        lock(&self.log).mark_all_read()
    }

    /// Empties the log.
    pub fn clear_notifications(&self) {
        lock(&self.log).clear();
    }

    /// Merges a REST-fetched list into the log.
    pub fn backfill(&self, entries: Vec<LoggedNotification>) {
        lock(&self.log).backfill(entries);
    }
}

impl Drop for RealtimeSyncClient {
    fn drop(&mut self) {
        if let Some(handle) = self.session.take() {
            handle.cancel.cancel();
        }
    }
}

fn lock(log: &Mutex<NotificationLog>) -> MutexGuard<'_, NotificationLog> {
    // A panicking callback never holds the lock, so the data is still consistent.
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, PartialEq, Eq)]
enum PumpExit {
    Cancelled,
    Disconnected,
}

struct Session {
    url: Url,
    reconnect_delay: Duration,
    connector: Arc<dyn Connector>,
    log: Arc<Mutex<NotificationLog>>,
    state: Arc<watch::Sender<ConnectionState>>,
    reconciler: Reconciler,
    on_snapshot: SnapshotCallback,
    on_notification: NotificationCallback,
    cancel: CancellationToken,
}

impl Session {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            log::info!("Connecting to realtime endpoint {}", self.url);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.url) => result,
            };

            match connected {
                Ok(mut transport) => {
                    self.set_state(ConnectionState::Open);
                    log::info!("Realtime channel open: {}", self.url);
                    if self.pump(transport.as_mut()).await == PumpExit::Cancelled {
                        transport.close().await;
                        break;
                    }
                }
                Err(e) => log::error!("Failed to connect to {}: {}", self.url, e),
            }

            self.set_state(ConnectionState::Closed);
            log::warn!(
                "Realtime channel closed. Reconnecting in {}ms...",
                self.reconnect_delay.as_millis()
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Closed);
        log::debug!("Realtime session for {} ended", self.url);
    }

    async fn pump(&mut self, transport: &mut dyn Transport) -> PumpExit {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PumpExit::Cancelled,
                frame = transport.next_frame() => frame,
            };

            match frame {
                Some(Ok(Frame::Text(text))) => self.dispatch(&text),
                Some(Ok(Frame::Binary(bytes))) => {
                    log::trace!("Ignoring {} byte binary frame", bytes.len());
                }
                Some(Ok(Frame::Close)) | None => {
                    log::warn!("Realtime channel closed by remote host.");
                    return PumpExit::Disconnected;
                }
                Some(Err(e)) => {
                    log::error!("Realtime channel read error: {}", e);
                    return PumpExit::Disconnected;
                }
            }
        }
    }

    fn dispatch(&mut self, text: &str) {
        let message = InboundMessage::parse(text);
        let routed = {
            let mut inbox = lock(&self.log);
            self.reconciler.route(message, &mut inbox, Instant::now(), Utc::now())
        };

        match routed {
            Routed::Snapshot(spots) => {
                log::trace!("Snapshot with {} spots", spots.len());
                (self.on_snapshot)(spots);
            }
            Routed::Alert(event) => {
                log::debug!("Surfacing {:?} notification: {}", event.category, event.title);
                (self.on_notification)(event);
            }
            Routed::Suppressed { subject_key } => {
                log::debug!("Skipping duplicate alert for {}", subject_key);
            }
            Routed::Ignored => log::trace!("Ignoring payload not meant for this client"),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug_assert!(previous.permits(next), "illegal transition {} -> {}", previous, next);
            log::debug!("Realtime connection {} -> {}", previous, next);
        }
    }
}
