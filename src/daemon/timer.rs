//! Timer engine for the shared Pomodoro timer.
//!
//! This module provides the core timer functionality:
//! - Start/pause/reset of the single shared countdown
//! - One-second countdown with automatic work/break transitions
//! - Pyramid schedule for progressive work durations
//! - Settings changes that take effect immediately
//!
//! The engine is pure state: it never sleeps or spawns. Arming and
//! disarming the tick driver is the synchronization layer's job.

use tracing::debug;

use crate::types::{
    clamp_minutes, pyramid_seconds, ModeChange, PomodoroConfig, SettingsUpdate, TimerMode,
    TimerState, DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES,
};

// ============================================================================
// TimerEvent
// ============================================================================

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed within the current session
    Tick {
        /// Remaining seconds
        remaining_seconds: u32,
    },
    /// The session ran out and the mode flipped
    ModeChanged(ModeChange),
}

impl TimerEvent {
    /// Returns the mode change carried by this event, if any.
    pub fn mode_change(&self) -> Option<ModeChange> {
        match self {
            TimerEvent::ModeChanged(change) => Some(*change),
            TimerEvent::Tick { .. } => None,
        }
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that owns the shared timer state.
#[derive(Debug, Clone, Default)]
pub struct TimerEngine {
    /// Current timer state
    state: TimerState,
}

impl TimerEngine {
    /// Creates a new TimerEngine with the given configuration.
    pub fn new(config: PomodoroConfig) -> Self {
        Self {
            state: TimerState::new(config),
        }
    }

    /// Marks the timer as running.
    ///
    /// Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        if self.state.is_running {
            return false;
        }
        self.state.is_running = true;
        true
    }

    /// Marks the timer as paused.
    ///
    /// Returns false if it was already paused.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.state.is_running = false;
        true
    }

    /// Stops the timer and returns to a fresh work session at cycle zero.
    pub fn reset(&mut self) {
        self.state.is_running = false;
        self.state.cycle_count = 0;
        // Recomputes the pyramid duration for cycle zero.
        self.state.begin_work();
    }

    /// Advances the countdown by one second.
    ///
    /// The second that brings the session to zero also performs the
    /// transition, so a session of N seconds ends after exactly N ticks.
    pub fn tick(&mut self) -> TimerEvent {
        if self.state.time_remaining > 0 {
            self.state.time_remaining -= 1;
        }

        if self.state.time_remaining > 0 {
            return TimerEvent::Tick {
                remaining_seconds: self.state.time_remaining,
            };
        }

        match self.state.mode {
            TimerMode::Work => self.state.begin_break(),
            TimerMode::Break => self.state.begin_work(),
        }
        debug!(
            mode = self.state.mode.as_str(),
            cycle = self.state.cycle_count,
            "Session complete"
        );

        TimerEvent::ModeChanged(ModeChange {
            mode: self.state.mode,
            cycle_count: self.state.cycle_count,
        })
    }

    /// Applies a settings change.
    ///
    /// Missing or unusable durations fall back to the defaults. While
    /// pyramid mode is on, the requested work duration is ignored. The
    /// current session is restarted at the new length of its mode, not
    /// prorated.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) {
        if let Some(enabled) = update.pyramid_mode() {
            self.state.pyramid_mode = enabled;
            if enabled {
                self.state.work_duration = pyramid_seconds(self.state.cycle_count);
            }
        }

        if !self.state.pyramid_mode {
            self.state.work_duration =
                clamp_minutes(update.work_minutes(), DEFAULT_WORK_MINUTES) * 60;
        }
        self.state.break_duration =
            clamp_minutes(update.break_minutes(), DEFAULT_BREAK_MINUTES) * 60;

        self.state.time_remaining = self.state.current_duration();
    }

    /// Returns true if the countdown is running.
    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Returns a reference to the current timer state.
    pub fn get_state(&self) -> &TimerState {
        &self.state
    }

    /// Returns a mutable reference to the timer state (for testing).
    #[cfg(test)]
    pub fn get_state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pyramid_minutes;

    fn create_engine() -> TimerEngine {
        TimerEngine::new(PomodoroConfig::default())
    }

    fn create_pyramid_engine() -> TimerEngine {
        TimerEngine::new(PomodoroConfig::default().with_pyramid_mode(true))
    }

    /// Ticks until the next mode change, returning the number of ticks taken.
    fn ticks_until_transition(engine: &mut TimerEngine) -> (u32, ModeChange) {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if let TimerEvent::ModeChanged(change) = engine.tick() {
                return (ticks, change);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Start / Pause Tests
    // ------------------------------------------------------------------------

    mod start_pause_tests {
        use super::*;

        #[test]
        fn test_new_engine() {
            let engine = create_engine();
            let state = engine.get_state();

            assert!(!state.is_running);
            assert_eq!(state.mode, TimerMode::Work);
            assert_eq!(state.time_remaining, 1500);
            assert_eq!(state.cycle_count, 0);
        }

        #[test]
        fn test_start() {
            let mut engine = create_engine();
            assert!(engine.start());
            assert!(engine.is_running());
        }

        #[test]
        fn test_start_is_idempotent() {
            let mut engine = create_engine();
            engine.start();
            let once = engine.get_state().clone();

            assert!(!engine.start());
            assert_eq!(engine.get_state(), &once);
        }

        #[test]
        fn test_pause() {
            let mut engine = create_engine();
            engine.start();
            assert!(engine.pause());
            assert!(!engine.is_running());
        }

        #[test]
        fn test_pause_is_idempotent() {
            let mut engine = create_engine();
            engine.start();
            engine.pause();
            let once = engine.get_state().clone();

            assert!(!engine.pause());
            assert_eq!(engine.get_state(), &once);
        }

        #[test]
        fn test_pause_preserves_remaining_time() {
            let mut engine = create_engine();
            engine.start();
            for _ in 0..10 {
                engine.tick();
            }
            engine.pause();

            assert_eq!(engine.get_state().time_remaining, 1490);
        }
    }

    // ------------------------------------------------------------------------
    // Reset Tests
    // ------------------------------------------------------------------------

    mod reset_tests {
        use super::*;

        #[test]
        fn test_reset_from_break() {
            let mut engine = create_engine();
            engine.start();
            {
                let state = engine.get_state_mut();
                state.mode = TimerMode::Break;
                state.cycle_count = 4;
                state.time_remaining = 12;
            }

            engine.reset();

            let state = engine.get_state();
            assert!(!state.is_running);
            assert_eq!(state.mode, TimerMode::Work);
            assert_eq!(state.cycle_count, 0);
            assert_eq!(state.time_remaining, state.work_duration);
            assert_eq!(state.work_duration, 1500);
        }

        #[test]
        fn test_reset_in_pyramid_mode() {
            let mut engine = create_pyramid_engine();
            engine.get_state_mut().cycle_count = 3;
            engine.get_state_mut().work_duration = pyramid_seconds(3);

            engine.reset();

            let state = engine.get_state();
            assert_eq!(state.work_duration, 300);
            assert_eq!(state.time_remaining, 300);
        }

        #[test]
        fn test_reset_twice_is_stable() {
            let mut engine = create_engine();
            engine.reset();
            let once = engine.get_state().clone();
            engine.reset();
            assert_eq!(engine.get_state(), &once);
        }
    }

    // ------------------------------------------------------------------------
    // Tick Tests
    // ------------------------------------------------------------------------

    mod tick_tests {
        use super::*;

        #[test]
        fn test_tick_counts_down() {
            let mut engine = create_engine();
            engine.start();

            let event = engine.tick();
            assert_eq!(
                event,
                TimerEvent::Tick {
                    remaining_seconds: 1499
                }
            );
            assert_eq!(event.mode_change(), None);
        }

        #[test]
        fn test_work_session_ends_after_exactly_its_duration() {
            let mut engine = create_engine();
            engine.start();

            let (ticks, change) = ticks_until_transition(&mut engine);

            assert_eq!(ticks, 1500);
            assert_eq!(
                change,
                ModeChange {
                    mode: TimerMode::Break,
                    cycle_count: 1
                }
            );
            let state = engine.get_state();
            assert_eq!(state.mode, TimerMode::Break);
            assert_eq!(state.cycle_count, 1);
            assert_eq!(state.time_remaining, 300);
        }

        #[test]
        fn test_exactly_one_transition_in_work_duration() {
            let mut engine = create_engine();
            engine.start();

            let transitions = (0..1500)
                .filter_map(|_| engine.tick().mode_change())
                .count();
            assert_eq!(transitions, 1);
        }

        #[test]
        fn test_break_to_work_keeps_cycle_count() {
            let mut engine = create_engine();
            engine.start();
            ticks_until_transition(&mut engine);

            let (ticks, change) = ticks_until_transition(&mut engine);

            assert_eq!(ticks, 300);
            assert_eq!(change.mode, TimerMode::Work);
            assert_eq!(change.cycle_count, 1);
            assert_eq!(engine.get_state().time_remaining, 1500);
        }

        #[test]
        fn test_tick_at_zero_transitions() {
            let mut engine = create_engine();
            engine.get_state_mut().time_remaining = 0;

            let event = engine.tick();
            assert_eq!(
                event.mode_change(),
                Some(ModeChange {
                    mode: TimerMode::Break,
                    cycle_count: 1
                })
            );
        }

        #[test]
        fn test_pyramid_grows_each_cycle() {
            let mut engine = create_pyramid_engine();
            engine.start();

            let mut work_lengths = Vec::new();
            for _ in 0..7 {
                work_lengths.push(engine.get_state().work_duration / 60);
                ticks_until_transition(&mut engine); // work -> break
                ticks_until_transition(&mut engine); // break -> work
            }

            assert_eq!(work_lengths, vec![5, 10, 15, 20, 25, 30, 30]);
        }
    }

    // ------------------------------------------------------------------------
    // Settings Tests
    // ------------------------------------------------------------------------

    mod settings_tests {
        use super::*;

        #[test]
        fn test_apply_durations() {
            let mut engine = create_engine();
            engine.apply_settings(
                &SettingsUpdate::default()
                    .with_work_minutes(30)
                    .with_break_minutes(10),
            );

            let state = engine.get_state();
            assert_eq!(state.work_duration, 1800);
            assert_eq!(state.break_duration, 600);
            assert_eq!(state.time_remaining, 1800);
        }

        #[test]
        fn test_zero_work_falls_back_to_default() {
            let mut engine = create_engine();
            engine.apply_settings(&SettingsUpdate::default().with_work_minutes(40));
            engine.apply_settings(&SettingsUpdate::default().with_work_minutes(0));

            assert_eq!(engine.get_state().work_duration, 25 * 60);
        }

        #[test]
        fn test_work_above_max_is_clamped() {
            let mut engine = create_engine();
            engine.apply_settings(&SettingsUpdate::default().with_work_minutes(120));

            assert_eq!(engine.get_state().work_duration, 60 * 60);
        }

        #[test]
        fn test_missing_fields_use_defaults() {
            let mut engine = create_engine();
            engine.apply_settings(
                &SettingsUpdate::default()
                    .with_work_minutes(50)
                    .with_break_minutes(20),
            );
            engine.apply_settings(&SettingsUpdate::default());

            let state = engine.get_state();
            assert_eq!(state.work_duration, 1500);
            assert_eq!(state.break_duration, 300);
        }

        #[test]
        fn test_enable_pyramid_at_cycle_two() {
            let mut engine = create_engine();
            engine.get_state_mut().cycle_count = 2;

            engine.apply_settings(&SettingsUpdate::default().with_pyramid_mode(true));

            let state = engine.get_state();
            assert!(state.pyramid_mode);
            assert_eq!(state.work_duration, 15 * 60);
            assert_eq!(state.time_remaining, 15 * 60);
        }

        #[test]
        fn test_pyramid_ignores_work_minutes() {
            let mut engine = create_pyramid_engine();
            engine.get_state_mut().cycle_count = 1;
            engine.apply_settings(&SettingsUpdate::default().with_pyramid_mode(true));

            engine.apply_settings(&SettingsUpdate::default().with_work_minutes(99));

            assert_eq!(engine.get_state().work_duration, pyramid_minutes(1) * 60);
        }

        #[test]
        fn test_pyramid_still_accepts_break_minutes() {
            let mut engine = create_pyramid_engine();
            engine.apply_settings(&SettingsUpdate::default().with_break_minutes(10));

            assert_eq!(engine.get_state().break_duration, 600);
            assert_eq!(engine.get_state().work_duration, 300);
        }

        #[test]
        fn test_disable_pyramid_restores_configured_work() {
            let mut engine = create_pyramid_engine();
            engine.apply_settings(
                &SettingsUpdate::default()
                    .with_pyramid_mode(false)
                    .with_work_minutes(45),
            );

            let state = engine.get_state();
            assert!(!state.pyramid_mode);
            assert_eq!(state.work_duration, 45 * 60);
        }

        #[test]
        fn test_settings_restart_current_break_session() {
            let mut engine = create_engine();
            engine.start();
            ticks_until_transition(&mut engine);
            for _ in 0..100 {
                engine.tick();
            }
            assert_eq!(engine.get_state().time_remaining, 200);

            engine.apply_settings(&SettingsUpdate::default().with_break_minutes(2));

            // Not prorated: the break restarts at the full new length.
            let state = engine.get_state();
            assert_eq!(state.mode, TimerMode::Break);
            assert_eq!(state.time_remaining, 120);
            assert!(state.is_running);
        }

        #[test]
        fn test_settings_extend_work_session() {
            let mut engine = create_engine();
            engine.start();
            for _ in 0..1400 {
                engine.tick();
            }

            engine.apply_settings(&SettingsUpdate::default().with_work_minutes(30));

            assert_eq!(engine.get_state().time_remaining, 1800);
        }
    }
}
