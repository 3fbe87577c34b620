//! Cancellable fixed-cadence tick driver.
//!
//! A [`TickDriver`] owns a spawned tokio task that calls back once per
//! period. Dropping the driver aborts the task, so replacing the stored
//! driver is enough to guarantee a single countdown.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::trace;

/// Default tick period for the shared countdown.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to a running tick task.
#[derive(Debug)]
pub struct TickDriver {
    /// Identifies this arming; ticks from older armings are stale
    generation: u64,
    /// Spawned ticking task
    handle: JoinHandle<()>,
}

impl TickDriver {
    /// Spawns a task that invokes `on_tick(generation)` every `period`.
    ///
    /// The first tick fires one full period after arming. The task stops
    /// when the callback resolves to false or the driver is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(generation: u64, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                trace!(generation, "tick");

                if !on_tick(generation).await {
                    break;
                }
            }
        });

        Self { generation, handle }
    }

    /// Returns the generation this driver was armed with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true once the ticking task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
