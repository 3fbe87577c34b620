//! Core data types for the shared Pomodoro timer.
//!
//! This module defines the data structures used for:
//! - The single authoritative timer state
//! - Duration rules (clamping, pyramid schedule)
//! - Wire messages exchanged between the server and connected clients

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Default work duration in minutes
pub const DEFAULT_WORK_MINUTES: u32 = 25;

/// Default break duration in minutes
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Shortest configurable session in minutes
pub const MIN_SESSION_MINUTES: u32 = 1;

/// Longest configurable session in minutes
pub const MAX_SESSION_MINUTES: u32 = 60;

/// First step of the pyramid schedule in minutes
const PYRAMID_BASE_MINUTES: u32 = 5;

/// Growth of the pyramid schedule per completed cycle in minutes
const PYRAMID_STEP_MINUTES: u32 = 5;

/// Ceiling of the pyramid schedule in minutes
const PYRAMID_MAX_MINUTES: u32 = 30;

// ============================================================================
// Duration rules
// ============================================================================

/// Returns the pyramid work duration in minutes for the given cycle count.
///
/// Cycle 0 is 5 minutes, each completed cycle adds 5, capped at 30.
pub fn pyramid_minutes(cycle_count: u32) -> u32 {
    PYRAMID_STEP_MINUTES
        .saturating_mul(cycle_count)
        .saturating_add(PYRAMID_BASE_MINUTES)
        .min(PYRAMID_MAX_MINUTES)
}

/// Returns the pyramid work duration in seconds for the given cycle count.
pub fn pyramid_seconds(cycle_count: u32) -> u32 {
    pyramid_minutes(cycle_count) * 60
}

/// Clamps a requested duration to the configurable range.
///
/// `None` and zero fall back to `default`; everything else is clamped to
/// 1-60 minutes.
pub fn clamp_minutes(requested: Option<i64>, default: u32) -> u32 {
    match requested {
        Some(minutes) if minutes != 0 => {
            let clamped = minutes.clamp(
                i64::from(MIN_SESSION_MINUTES),
                i64::from(MAX_SESSION_MINUTES),
            );
            // Within 1..=60 after the clamp.
            clamped as u32
        }
        _ => default,
    }
}

/// Formats seconds as a zero-padded `MM:SS` string.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

// ============================================================================
// TimerMode
// ============================================================================

/// The kind of session the shared countdown is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Focused work session
    #[default]
    Work,
    /// Break between work sessions
    Break,
}

impl TimerMode {
    /// Returns the wire representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }

    /// Returns a capitalized label for display.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "Work",
            TimerMode::Break => "Break",
        }
    }
}

// ============================================================================
// PomodoroConfig
// ============================================================================

/// Initial configuration the server starts the shared timer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    /// Work duration in minutes (1-60, ignored when pyramid mode is on)
    pub work_minutes: u32,
    /// Break duration in minutes (1-60)
    pub break_minutes: u32,
    /// Whether the work duration follows the pyramid schedule
    pub pyramid_mode: bool,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
            pyramid_mode: false,
        }
    }
}

impl PomodoroConfig {
    /// Creates a new configuration with the specified work duration.
    pub fn with_work_minutes(mut self, minutes: u32) -> Self {
        self.work_minutes = minutes;
        self
    }

    /// Creates a new configuration with the specified break duration.
    pub fn with_break_minutes(mut self, minutes: u32) -> Self {
        self.break_minutes = minutes;
        self
    }

    /// Creates a new configuration with pyramid mode toggled.
    pub fn with_pyramid_mode(mut self, enabled: bool) -> Self {
        self.pyramid_mode = enabled;
        self
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The single shared countdown observed by every connected client.
///
/// Durations and the remaining time are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Whether the countdown is actively ticking
    pub is_running: bool,
    /// Seconds left in the current session
    pub time_remaining: u32,
    /// Current session kind
    pub mode: TimerMode,
    /// Work session length in seconds
    pub work_duration: u32,
    /// Break session length in seconds
    pub break_duration: u32,
    /// Completed work sessions since the last reset
    pub cycle_count: u32,
    /// Whether the work duration follows the pyramid schedule
    pub pyramid_mode: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(PomodoroConfig::default())
    }
}

impl TimerState {
    /// Creates a paused work session at cycle zero from the configuration.
    pub fn new(config: PomodoroConfig) -> Self {
        let work_minutes = if config.pyramid_mode {
            pyramid_minutes(0)
        } else {
            clamp_minutes(Some(i64::from(config.work_minutes)), DEFAULT_WORK_MINUTES)
        };
        let break_minutes =
            clamp_minutes(Some(i64::from(config.break_minutes)), DEFAULT_BREAK_MINUTES);

        Self {
            is_running: false,
            time_remaining: work_minutes * 60,
            mode: TimerMode::Work,
            work_duration: work_minutes * 60,
            break_duration: break_minutes * 60,
            cycle_count: 0,
            pyramid_mode: config.pyramid_mode,
        }
    }

    /// Returns the full length of the current session in seconds.
    pub fn current_duration(&self) -> u32 {
        match self.mode {
            TimerMode::Work => self.work_duration,
            TimerMode::Break => self.break_duration,
        }
    }

    /// Switches to a work session, recomputing the pyramid duration if enabled.
    pub fn begin_work(&mut self) {
        self.mode = TimerMode::Work;
        if self.pyramid_mode {
            self.work_duration = pyramid_seconds(self.cycle_count);
        }
        self.time_remaining = self.work_duration;
    }

    /// Switches to a break session, counting the completed work cycle.
    pub fn begin_break(&mut self) {
        self.mode = TimerMode::Break;
        self.cycle_count += 1;
        self.time_remaining = self.break_duration;
    }

    /// Returns the elapsed fraction of the current session (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        let total = self.current_duration();
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.time_remaining);
        (f64::from(elapsed) / f64::from(total)).clamp(0.0, 1.0)
    }

    /// Returns the remaining time formatted as `MM:SS`.
    pub fn formatted_time(&self) -> String {
        format_time(self.time_remaining)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Timer state as broadcast to clients, with the display string attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// The full timer state
    #[serde(flatten)]
    pub state: TimerState,
    /// Remaining time as `MM:SS`
    pub formatted_time: String,
}

impl TimerSnapshot {
    /// Creates a snapshot from the timer state.
    pub fn from_timer_state(state: &TimerState) -> Self {
        Self {
            state: state.clone(),
            formatted_time: state.formatted_time(),
        }
    }
}

/// Payload of a mode transition notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChange {
    /// Mode that just began
    pub mode: TimerMode,
    /// Cycle count after the transition
    pub cycle_count: u32,
}

/// Settings requested by a client.
///
/// Fields are kept as raw JSON so malformed values degrade to defaults
/// instead of rejecting the whole command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// Work duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_duration: Option<Value>,
    /// Break duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration: Option<Value>,
    /// Pyramid mode toggle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pyramid_mode: Option<Value>,
}

impl SettingsUpdate {
    /// Sets the requested work duration.
    pub fn with_work_minutes(mut self, minutes: i64) -> Self {
        self.work_duration = Some(Value::from(minutes));
        self
    }

    /// Sets the requested break duration.
    pub fn with_break_minutes(mut self, minutes: i64) -> Self {
        self.break_duration = Some(Value::from(minutes));
        self
    }

    /// Sets the requested pyramid mode.
    pub fn with_pyramid_mode(mut self, enabled: bool) -> Self {
        self.pyramid_mode = Some(Value::Bool(enabled));
        self
    }

    /// Returns the work minutes if the value is usable.
    pub fn work_minutes(&self) -> Option<i64> {
        lenient_minutes(self.work_duration.as_ref())
    }

    /// Returns the break minutes if the value is usable.
    pub fn break_minutes(&self) -> Option<i64> {
        lenient_minutes(self.break_duration.as_ref())
    }

    /// Returns the pyramid toggle if it was sent as a boolean.
    pub fn pyramid_mode(&self) -> Option<bool> {
        self.pyramid_mode.as_ref().and_then(Value::as_bool)
    }
}

/// Reads a minute count from a number or the leading digits of a string.
///
/// Zero is treated as absent.
fn lenient_minutes(value: Option<&Value>) -> Option<i64> {
    let minutes = match value? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64().filter(|f| f.is_finite())?.trunc() as i64,
        },
        Value::String(s) => leading_integer(s)?,
        _ => return None,
    };
    (minutes != 0).then_some(minutes)
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Only overflow can fail here.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

/// Command sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Start the shared countdown
    StartTimer,
    /// Pause the shared countdown
    PauseTimer,
    /// Reset to a paused work session at cycle zero
    ResetTimer,
    /// Change durations or pyramid mode
    UpdateSettings(SettingsUpdate),
}

impl ClientCommand {
    /// Returns the wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::StartTimer => "start-timer",
            ClientCommand::PauseTimer => "pause-timer",
            ClientCommand::ResetTimer => "reset-timer",
            ClientCommand::UpdateSettings(_) => "update-settings",
        }
    }
}

/// Event pushed from the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full state after a change, or on connect
    TimerUpdate(TimerSnapshot),
    /// A work/break transition happened
    ModeChanged(ModeChange),
    /// Number of connected clients changed
    UserCountUpdate(usize),
}

// ============================================================================
// Tests
// ============================================================================
