//! Synchronization hub for the shared timer.
//!
//! The hub bridges the [`TimerEngine`] to any number of connected clients:
//! - Observer registry of per-connection outboxes
//! - Command dispatch followed by a full-state broadcast
//! - Ownership of the single tick driver
//!
//! Every mutation and its broadcast run under one lock, so clients see
//! changes in the order they were applied.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::types::{
    ClientCommand, PomodoroConfig, ServerEvent, SettingsUpdate, TimerSnapshot, TimerState,
};

use super::ticker::{TickDriver, TICK_PERIOD};
use super::timer::{TimerEngine, TimerEvent};

// ============================================================================
// ConnectionId
// ============================================================================

/// Identity of one connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a client's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

// ============================================================================
// SyncHub
// ============================================================================

/// State guarded by the hub lock.
struct HubInner {
    /// The one shared timer
    engine: TimerEngine,
    /// Outboxes of connected clients
    clients: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    /// Armed tick driver, if the timer is running
    driver: Option<TickDriver>,
    /// Generation handed to the next armed driver
    next_generation: u64,
}

impl HubInner {
    /// Delivers an event to every connected client.
    fn broadcast(&self, event: ServerEvent) {
        for (id, outbox) in &self.clients {
            if outbox.send(event.clone()).is_err() {
                debug!(%id, "Skipping closed client outbox");
            }
        }
    }

    fn broadcast_state(&self) {
        self.broadcast(ServerEvent::TimerUpdate(TimerSnapshot::from_timer_state(
            self.engine.get_state(),
        )));
    }

    /// Runs one tick and broadcasts its results. No-op while paused.
    fn tick(&mut self) {
        if !self.engine.is_running() {
            return;
        }

        let event = self.engine.tick();
        trace!(remaining = self.engine.get_state().time_remaining, "Tick");
        self.broadcast_state();

        if let TimerEvent::ModeChanged(change) = event {
            info!(
                mode = change.mode.as_str(),
                cycle = change.cycle_count,
                "Mode changed"
            );
            self.broadcast(ServerEvent::ModeChanged(change));
        }
    }
}

/// Shared timer plus the set of clients observing it.
pub struct SyncHub {
    /// Engine, registry, and driver behind a single lock
    inner: Mutex<HubInner>,
    /// Cadence of the tick driver
    tick_period: Duration,
    /// Handle to ourselves for the driver task
    this: Weak<SyncHub>,
}

impl SyncHub {
    /// Creates a hub ticking once per second.
    pub fn new(config: PomodoroConfig) -> Arc<Self> {
        Self::with_tick_period(config, TICK_PERIOD)
    }

    /// Creates a hub with a custom tick period.
    pub fn with_tick_period(config: PomodoroConfig, tick_period: Duration) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            inner: Mutex::new(HubInner {
                engine: TimerEngine::new(config),
                clients: HashMap::new(),
                driver: None,
                next_generation: 0,
            }),
            tick_period,
            this: this.clone(),
        })
    }

    // ------------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------------

    /// Registers a new client.
    ///
    /// Everyone receives the new user count, then the new client alone
    /// receives the current timer state.
    pub async fn connect(&self) -> (ConnectionId, EventReceiver) {
        let id = ConnectionId::new();
        let (outbox, inbox) = mpsc::unbounded_channel();

        let mut inner = self.inner.lock().await;
        inner.clients.insert(id, outbox.clone());

        let users = inner.clients.len();
        info!(%id, users, "User connected");
        inner.broadcast(ServerEvent::UserCountUpdate(users));

        let _ = outbox.send(ServerEvent::TimerUpdate(TimerSnapshot::from_timer_state(
            inner.engine.get_state(),
        )));

        (id, inbox)
    }

    /// Removes a client and broadcasts the new user count.
    ///
    /// Unknown ids are ignored, so the count never goes negative.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().await;
        if inner.clients.remove(&id).is_none() {
            return;
        }

        let users = inner.clients.len();
        info!(%id, users, "User disconnected");
        inner.broadcast(ServerEvent::UserCountUpdate(users));
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Applies a command received from `origin`.
    pub async fn handle(&self, origin: ConnectionId, command: ClientCommand) {
        match command {
            ClientCommand::StartTimer => {
                if self.start().await {
                    info!(%origin, "Timer started");
                }
            }
            ClientCommand::PauseTimer => {
                if self.pause().await {
                    info!(%origin, "Timer paused");
                }
            }
            ClientCommand::ResetTimer => {
                self.reset().await;
                info!(%origin, "Timer reset");
            }
            ClientCommand::UpdateSettings(update) => {
                let state = self.update_settings(update).await;
                info!(
                    %origin,
                    work = state.work_duration / 60,
                    break_minutes = state.break_duration / 60,
                    pyramid = state.pyramid_mode,
                    "Settings updated"
                );
            }
        }
    }

    /// Starts the countdown and arms the tick driver.
    ///
    /// Returns false without broadcasting if already running.
    pub async fn start(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.engine.start() {
            debug!("Start ignored: timer already running");
            return false;
        }

        self.arm_driver(&mut inner);
        inner.broadcast_state();
        true
    }

    /// Pauses the countdown and disarms the tick driver.
    ///
    /// Returns false without broadcasting if already paused.
    pub async fn pause(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.engine.pause() {
            debug!("Pause ignored: timer not running");
            return false;
        }

        inner.driver = None;
        inner.broadcast_state();
        true
    }

    /// Resets the timer and disarms the tick driver.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.engine.reset();
        inner.driver = None;
        inner.broadcast_state();
    }

    /// Applies new settings, re-arming the driver if the timer is running.
    ///
    /// Returns the resulting state.
    pub async fn update_settings(&self, update: SettingsUpdate) -> TimerState {
        let mut inner = self.inner.lock().await;
        inner.engine.apply_settings(&update);

        if inner.engine.is_running() {
            self.arm_driver(&mut inner);
        }
        inner.broadcast_state();
        inner.engine.get_state().clone()
    }

    /// Advances the countdown by one second and broadcasts the result.
    ///
    /// A mode transition additionally broadcasts a mode-change event.
    pub async fn on_tick_elapsed(&self) {
        self.inner.lock().await.tick();
    }

    // ------------------------------------------------------------------------
    // Tick driver
    // ------------------------------------------------------------------------

    /// Replaces any armed driver with a fresh one.
    fn arm_driver(&self, inner: &mut HubInner) {
        let generation = inner.next_generation;
        inner.next_generation += 1;

        let hub = self.this.clone();
        // Assigning drops, and so aborts, the previous driver.
        inner.driver = Some(TickDriver::arm(
            generation,
            self.tick_period,
            move |generation| {
                let hub = hub.clone();
                async move {
                    match hub.upgrade() {
                        Some(hub) => hub.driver_tick(generation).await,
                        None => false,
                    }
                }
            },
        ));
        debug!(generation, "Tick driver armed");
    }

    /// Tick entry point for the driver task.
    ///
    /// Returns false if the calling driver is no longer the armed one.
    async fn driver_tick(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock().await;
        let armed = inner.driver.as_ref().map(TickDriver::generation);
        if armed != Some(generation) {
            debug!(generation, ?armed, "Dropping stale tick");
            return false;
        }

        inner.tick();
        true
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns a copy of the current timer state.
    pub async fn snapshot(&self) -> TimerState {
        self.inner.lock().await.engine.get_state().clone()
    }

    /// Returns the number of connected clients.
    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.clients.len()
    }

    /// Returns true if a tick driver is armed.
    pub async fn is_ticking(&self) -> bool {
        self.inner
            .lock()
            .await
            .driver
            .as_ref()
            .is_some_and(|driver| !driver.is_finished())
    }
}

// ============================================================================
// Tests
// ============================================================================
