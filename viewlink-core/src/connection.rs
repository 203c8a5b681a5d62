//! Connection lifecycle management.
//!
//! [`ConnectionManager`] exclusively owns the transport and runs the
//! connection state machine:
//!
//! ```text
//!  Idle ──connect──► Connecting ──open──► Connected
//!                        │                    │
//!                     timeout/fail        close/error
//!                        ▼                    ▼
//!                     Errored ◄──exhausted─ Disconnected
//!                        │                    │
//!                        └──── backoff elapsed┴──► Connecting
//! ```
//!
//! The manager is an actor: spawn [`run`](ConnectionManager::run) on
//! the runtime and drive it through a cloneable [`ConnectionHandle`].
//! Every inbound message, timer tick and command is processed to
//! completion on the manager's single task, so the frame store only
//! ever has one writer. Explicit disconnect drops the session select
//! loop, which cancels the heartbeat, stats tick and any pending
//! reconnect timer in the same step — no stale timer can fire against
//! a torn-down socket.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::FrameCodec;
use crate::decompress::{Decompressor, ZstdDecompressor};
use crate::error::ViewError;
use crate::event::{StreamBus, StreamEvent};
use crate::frame::BufferedFrame;
use crate::message::ControlMessage;
use crate::metrics::MetricsTracker;
use crate::quality::{QualityController, QualityLevel};
use crate::store::FrameStore;
use crate::transport::{Connector, Transport, TransportMessage};

// ── ConnectionState ──────────────────────────────────────────────

/// The current phase of the streaming link.
///
/// Exactly one instance exists, owned by the manager and mutated only
/// by its internal transition logic; consumers observe it through a
/// `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and none pending. Initial state, and the state
    /// after an explicit disconnect.
    #[default]
    Idle,
    /// Transport open in progress.
    Connecting,
    /// Link is up and frames are flowing.
    Connected,
    /// Link was lost; a reconnect may be pending.
    Disconnected,
    /// Open failed or the reconnect budget is spent.
    Errored,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Errored => write!(f, "Errored"),
        }
    }
}

// ── ConnectionConfig ─────────────────────────────────────────────

/// Tunables for [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Deadline for the transport-open race.
    pub connect_timeout: Duration,
    /// Interval between `ping` control messages while connected.
    pub heartbeat_interval: Duration,
    /// Interval between `stats` events while connected.
    pub stats_interval: Duration,
    /// First reconnect delay; doubles per attempt.
    pub reconnect_base_delay: Duration,
    /// Automatic reconnects before giving up.
    pub max_reconnect_attempts: u32,
    /// Frame store capacity.
    pub frame_capacity: usize,
    /// Evict buffered frames older than this, when set.
    pub max_frame_age_ms: Option<i64>,
    /// Quality level announced on every `Connected` transition.
    pub initial_quality: QualityLevel,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(10),
            stats_interval: Duration::from_secs(1),
            reconnect_base_delay: Duration::from_secs(1),
            max_reconnect_attempts: 5,
            frame_capacity: 30,
            max_frame_age_ms: Some(10_000),
            initial_quality: QualityLevel::High,
        }
    }
}

/// Delay before reconnect attempt `attempt` (1-based): exponential
/// backoff, `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    debug_assert!(attempt >= 1);
    base.saturating_mul(1u32 << (attempt - 1).min(16))
}

// ── Commands ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Pause,
    Resume,
    SetQuality(QualityLevel),
}

/// Why a live session ended.
enum SessionEnd {
    /// User-initiated disconnect; no reconnect follows.
    Explicit,
    /// Transport close or error; reconnect policy applies.
    Lost(String),
    /// Every handle was dropped; the manager exits.
    Shutdown,
}

enum ConnectOutcome {
    Opened(Box<dyn Transport>),
    /// Disconnect arrived mid-open; the attempt is abandoned.
    Aborted,
    Shutdown,
}

// ── ConnectionHandle ─────────────────────────────────────────────

/// Cloneable handle driving a spawned [`ConnectionManager`].
#[derive(Clone)]
pub struct ConnectionHandle {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    bus: StreamBus,
    store: Arc<Mutex<FrameStore>>,
}

impl ConnectionHandle {
    /// Start connecting. No-op when already connecting or connected.
    pub async fn connect(&self) -> Result<(), ViewError> {
        Ok(self.cmd_tx.send(Command::Connect).await?)
    }

    /// Explicit disconnect: closes the transport, cancels heartbeat
    /// and any pending reconnect, and never reconnects automatically.
    pub async fn disconnect(&self) -> Result<(), ViewError> {
        Ok(self.cmd_tx.send(Command::Disconnect).await?)
    }

    /// Stop processing inbound frames (messages are still received
    /// and discarded).
    pub async fn pause(&self) -> Result<(), ViewError> {
        Ok(self.cmd_tx.send(Command::Pause).await?)
    }

    /// Resume processing inbound frames.
    pub async fn resume(&self) -> Result<(), ViewError> {
        Ok(self.cmd_tx.send(Command::Resume).await?)
    }

    /// Switch quality level by name.
    ///
    /// Unknown names fail here with [`ViewError::Config`] before
    /// anything is sent. The new level is announced immediately when
    /// connected, otherwise retained and replayed on the next
    /// `Connected` transition.
    pub async fn set_quality(&self, name: &str) -> Result<(), ViewError> {
        let level: QualityLevel = name.parse()?;
        Ok(self.cmd_tx.send(Command::SetQuality(level)).await?)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch channel for state transitions.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Subscribe to [`StreamEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.bus.subscribe()
    }

    /// Shared read access to the frame store.
    pub fn store(&self) -> Arc<Mutex<FrameStore>> {
        Arc::clone(&self.store)
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// Owns the transport and runs the streaming client pipeline.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    decompressor: Arc<dyn Decompressor>,
    clock: Arc<dyn Clock>,
    config: ConnectionConfig,
    bus: StreamBus,
    store: Arc<Mutex<FrameStore>>,
    metrics: MetricsTracker,
    quality: QualityController,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::Receiver<Command>,
    reconnect_attempts: u32,
    reconnect_deadline: Option<Instant>,
    paused: bool,
}

impl ConnectionManager {
    /// Create a manager with the production clock and zstd
    /// decompressor.
    pub fn new(
        connector: Box<dyn Connector>,
        config: ConnectionConfig,
    ) -> (Self, ConnectionHandle) {
        Self::with_parts(
            connector,
            Arc::new(ZstdDecompressor),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Create a manager with injected clock and decompression
    /// capability.
    pub fn with_parts(
        connector: Box<dyn Connector>,
        decompressor: Arc<dyn Decompressor>,
        clock: Arc<dyn Clock>,
        config: ConnectionConfig,
    ) -> (Self, ConnectionHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let bus = StreamBus::new(256);
        let store = Arc::new(Mutex::new(FrameStore::new(config.frame_capacity)));
        let quality = QualityController::new(config.initial_quality);

        let handle = ConnectionHandle {
            cmd_tx,
            state_rx,
            bus: bus.clone(),
            store: Arc::clone(&store),
        };
        let manager = Self {
            connector,
            decompressor,
            clock,
            config,
            bus,
            store,
            metrics: MetricsTracker::new(),
            quality,
            state_tx,
            cmd_rx,
            reconnect_attempts: 0,
            reconnect_deadline: None,
            paused: false,
        };
        (manager, handle)
    }

    /// Run the manager until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            // Idle / Disconnected / Errored: wait for a command, or
            // for a scheduled reconnect to come due.
            let (command, timer_fired) = if let Some(deadline) = self.reconnect_deadline {
                tokio::select! {
                    cmd = self.cmd_rx.recv() => (cmd, false),
                    _ = tokio::time::sleep_until(deadline) => {
                        self.reconnect_deadline = None;
                        info!(attempt = self.reconnect_attempts, "reconnect timer elapsed");
                        (Some(Command::Connect), true)
                    }
                }
            } else {
                (self.cmd_rx.recv().await, false)
            };

            let should_connect = match command {
                None => return,
                Some(Command::Connect) => {
                    // A user-initiated connect restarts the reconnect
                    // budget, whether a timer is pending or the budget
                    // is already spent; timer-driven attempts keep
                    // counting.
                    if !timer_fired {
                        self.reconnect_deadline = None;
                        self.reconnect_attempts = 0;
                    }
                    true
                }
                Some(Command::Disconnect) => {
                    self.reconnect_deadline = None;
                    self.set_state(ConnectionState::Idle);
                    false
                }
                Some(Command::Pause) => {
                    self.paused = true;
                    false
                }
                Some(Command::Resume) => {
                    self.paused = false;
                    false
                }
                Some(Command::SetQuality(level)) => {
                    // Retained; replayed on the next Connected.
                    self.quality.set_level(level);
                    false
                }
            };
            if !should_connect {
                continue;
            }

            match self.open_transport().await {
                Ok(ConnectOutcome::Shutdown) => return,
                Ok(ConnectOutcome::Aborted) => {
                    self.reconnect_deadline = None;
                    self.set_state(ConnectionState::Idle);
                }
                Ok(ConnectOutcome::Opened(transport)) => {
                    self.reconnect_attempts = 0;
                    self.set_state(ConnectionState::Connected);
                    info!("connected");
                    self.bus.publish(StreamEvent::Connected);

                    match self.session(transport).await {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Explicit => {
                            info!("disconnected by request");
                            self.clear_store();
                            self.set_state(ConnectionState::Idle);
                            self.bus.publish(StreamEvent::Disconnected);
                        }
                        SessionEnd::Lost(reason) => {
                            warn!(%reason, "connection lost");
                            self.clear_store();
                            self.set_state(ConnectionState::Disconnected);
                            self.bus.publish(StreamEvent::Disconnected);
                            self.schedule_reconnect();
                        }
                    }
                }
                Err(e) => {
                    warn!("connect failed: {e}");
                    self.set_state(ConnectionState::Errored);
                    self.bus.publish(StreamEvent::Error {
                        reason: e.to_string(),
                    });
                    self.schedule_reconnect();
                }
            }
        }
    }

    // ── Connecting ───────────────────────────────────────────────

    /// Race the transport open against the connect timeout while
    /// still honoring commands.
    async fn open_transport(&mut self) -> Result<ConnectOutcome, ViewError> {
        self.set_state(ConnectionState::Connecting);
        info!("connecting");

        let timeout = self.config.connect_timeout;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let connect = self.connector.connect();
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => return result.map(ConnectOutcome::Opened),
                _ = &mut deadline => return Err(ViewError::Timeout(timeout)),
                cmd = self.cmd_rx.recv() => match cmd {
                    None => return Ok(ConnectOutcome::Shutdown),
                    Some(Command::Disconnect) => return Ok(ConnectOutcome::Aborted),
                    Some(Command::Connect) => {} // already connecting
                    Some(Command::Pause) => self.paused = true,
                    Some(Command::Resume) => self.paused = false,
                    Some(Command::SetQuality(level)) => self.quality.set_level(level),
                },
            }
        }
    }

    // ── Connected ────────────────────────────────────────────────

    /// Drive one live session to its end.
    ///
    /// Heartbeat and stats intervals live on this stack frame, so
    /// leaving the session stops both.
    async fn session(&mut self, mut transport: Box<dyn Transport>) -> SessionEnd {
        // Replay the active quality profile so the producer and a
        // freshly (re)connected client agree.
        if let Err(e) = self.send_control(&mut transport, self.quality.control_message()).await {
            return SessionEnd::Lost(e.to_string());
        }

        let hb = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + hb, hb);
        let st = self.config.stats_interval;
        let mut stats = interval_at(Instant::now() + st, st);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    None => {
                        let _ = transport.close().await;
                        return SessionEnd::Shutdown;
                    }
                    Some(Command::Disconnect) => {
                        let _ = transport.close().await;
                        return SessionEnd::Explicit;
                    }
                    Some(Command::Connect) => {} // already connected
                    Some(Command::Pause) => self.paused = true,
                    Some(Command::Resume) => self.paused = false,
                    Some(Command::SetQuality(level)) => {
                        self.quality.set_level(level);
                        let msg = self.quality.control_message();
                        if let Err(e) = self.send_control(&mut transport, msg).await {
                            return SessionEnd::Lost(e.to_string());
                        }
                    }
                },
                inbound = transport.recv() => match inbound {
                    None => return SessionEnd::Lost("peer closed the connection".into()),
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    Some(Ok(message)) => self.handle_inbound(message),
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = self.send_control(&mut transport, ControlMessage::Ping).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                },
                _ = stats.tick() => {
                    let snapshot = self.metrics.on_tick();
                    self.bus.publish(StreamEvent::Stats(snapshot));
                },
            }
        }
    }

    async fn send_control(
        &self,
        transport: &mut Box<dyn Transport>,
        message: ControlMessage,
    ) -> Result<(), ViewError> {
        transport.send(message.to_transport()?).await
    }

    /// Process one inbound message to completion.
    fn handle_inbound(&mut self, message: TransportMessage) {
        if self.paused {
            return; // received but deliberately not processed
        }
        match message {
            TransportMessage::Text(text) => {
                debug!(%text, "ignoring text message from producer");
            }
            TransportMessage::Binary(bytes) => self.handle_frame_message(&bytes),
        }
    }

    /// Decode, decompress, validate and buffer one frame message.
    ///
    /// All failures here are per-message: the connection stays alive.
    fn handle_frame_message(&mut self, message: &[u8]) {
        let wire = match FrameCodec::decode(message) {
            Ok(w) => w,
            Err(e) => {
                warn!("dropping malformed message: {e}");
                return;
            }
        };

        let mut header = wire.header;
        let pixels = if header.compressed {
            match self.decompressor.decompress(&wire.payload) {
                Ok(raw) => Bytes::from(raw),
                Err(e) => {
                    warn!(frame_id = header.frame_id, "dropping frame: {e}");
                    self.metrics.record_dropped();
                    return;
                }
            }
        } else {
            wire.payload
        };

        let now = self.clock.now_ms();
        header.latency = Some(now - header.timestamp);

        let frame = match BufferedFrame::new(pixels, header, now) {
            Ok(f) => Arc::new(f),
            Err(e) => {
                warn!(frame_id = header.frame_id, "dropping frame: {e}");
                self.metrics.record_dropped();
                return;
            }
        };

        self.metrics.record_frame(header.latency.unwrap_or(0));
        {
            let mut store = lock_store(&self.store);
            if let Some(max_age) = self.config.max_frame_age_ms {
                let evicted = store.drop_old_frames(max_age, now);
                if evicted > 0 {
                    debug!(evicted, "pruned stale frames");
                }
            }
            store.add_frame(Arc::clone(&frame));
        }
        self.bus.publish(StreamEvent::Frame(frame));
    }

    // ── Internal ─────────────────────────────────────────────────

    fn schedule_reconnect(&mut self) {
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            let err = ViewError::ReconnectExhausted {
                attempts: self.reconnect_attempts,
            };
            warn!("{err}");
            self.set_state(ConnectionState::Errored);
            self.bus.publish(StreamEvent::Error {
                reason: err.to_string(),
            });
            return;
        }
        self.reconnect_attempts += 1;
        let delay = backoff_delay(self.config.reconnect_base_delay, self.reconnect_attempts);
        self.reconnect_deadline = Some(Instant::now() + delay);
        info!(
            attempt = self.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        self.bus.publish(StreamEvent::ReconnectScheduled {
            attempt: self.reconnect_attempts,
            delay,
        });
    }

    fn clear_store(&mut self) {
        lock_store(&self.store).clear();
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }
}

/// Lock the shared store, recovering the guard if a reader panicked.
fn lock_store(store: &Arc<Mutex<FrameStore>>) -> std::sync::MutexGuard<'_, FrameStore> {
    match store.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ── Tests ────────────────────────────────────────────────────────
