//! Display utilities for the shared Pomodoro timer CLI.
//!
//! This module provides formatted output for:
//! - Command results and status
//! - Live `watch` rendering of server events
//! - Mode change notifications
//! - Error messages

use std::io::Write;
use std::net::SocketAddr;

use crate::types::{ModeChange, ServerEvent, TimerMode, TimerSnapshot, TimerState};

/// Width of the progress track in characters
const TRACK_WIDTH: usize = 30;

/// Terminal bell
const BELL: char = '\u{7}';

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the address the server is listening on.
    pub fn show_serving(addr: SocketAddr) {
        println!("Pomodoro Express running on {}", addr);
        println!("  Connect with: pomodoro-express watch --server {}", addr);
    }

    /// Shows the result of a start command.
    pub fn show_start_success(snapshot: &TimerSnapshot) {
        println!("> Timer running");
        println!("  {}", Self::summary(&snapshot.state));
    }

    /// Shows the result of a pause command.
    pub fn show_pause_success(snapshot: &TimerSnapshot) {
        println!("|| Timer paused");
        println!("  {}", Self::summary(&snapshot.state));
    }

    /// Shows the result of a reset command.
    pub fn show_reset_success(snapshot: &TimerSnapshot) {
        println!("[] Timer reset");
        println!("  {}", Self::summary(&snapshot.state));
    }

    /// Shows the result of a settings command.
    pub fn show_settings_success(snapshot: &TimerSnapshot) {
        let state = &snapshot.state;
        println!("* Settings applied");
        println!("  Work:    {} min", state.work_duration / 60);
        println!("  Break:   {} min", state.break_duration / 60);
        println!(
            "  Pyramid: {}",
            if state.pyramid_mode { "on" } else { "off" }
        );
    }

    /// Shows the current timer status.
    pub fn show_status(snapshot: &TimerSnapshot) {
        let state = &snapshot.state;
        println!("Pomodoro Express status");
        println!("─────────────────────────────");
        println!("Mode:      {}", state.mode.label());
        println!("Remaining: {}", snapshot.formatted_time);
        println!(
            "State:     {}",
            if state.is_running { "running" } else { "paused" }
        );
        println!("Cycle:     #{}", state.cycle_count);
        println!(
            "Durations: work {} min / break {} min{}",
            state.work_duration / 60,
            state.break_duration / 60,
            if state.pyramid_mode { " (pyramid)" } else { "" }
        );
        println!("{}", Self::progress_track(state, TRACK_WIDTH));
    }

    /// Renders one event from a live stream.
    ///
    /// Timer updates redraw the current line; other events print on their own.
    pub fn show_event(event: &ServerEvent) {
        let mut stdout = std::io::stdout();
        match event {
            ServerEvent::TimerUpdate(_) => {
                let _ = write!(stdout, "\r{}", Self::render_event(event));
            }
            ServerEvent::ModeChanged(_) => {
                let _ = writeln!(stdout, "\n{}{}", BELL, Self::render_event(event));
            }
            ServerEvent::UserCountUpdate(_) => {
                let _ = writeln!(stdout, "\n{}", Self::render_event(event));
            }
        }
        let _ = stdout.flush();
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Formats one event as a single line.
    pub fn render_event(event: &ServerEvent) -> String {
        match event {
            ServerEvent::TimerUpdate(snapshot) => format!(
                "{} {} {} #{} {}",
                Self::progress_track(&snapshot.state, TRACK_WIDTH),
                snapshot.formatted_time,
                snapshot.state.mode.label(),
                snapshot.state.cycle_count,
                if snapshot.state.is_running { "running" } else { "paused " }
            ),
            ServerEvent::ModeChanged(change) => Self::mode_change_message(change),
            ServerEvent::UserCountUpdate(1) => "1 user connected".to_string(),
            ServerEvent::UserCountUpdate(count) => format!("{} users connected", count),
        }
    }

    /// Returns the notification text for a mode change.
    pub fn mode_change_message(change: &ModeChange) -> String {
        match change.mode {
            TimerMode::Work => {
                format!("All aboard! Work time begins - Cycle {}", change.cycle_count)
            }
            TimerMode::Break => {
                format!("Break station! Time to rest - Cycle {}", change.cycle_count)
            }
        }
    }

    /// Draws session progress as a track `[====>-----]` of `width` cells.
    pub fn progress_track(state: &TimerState, width: usize) -> String {
        let filled = ((state.progress() * width as f64).round() as usize).min(width);
        let mut track = String::with_capacity(width + 2);
        track.push('[');
        for cell in 0..width {
            track.push(match cell {
                c if c + 1 < filled => '=',
                c if c + 1 == filled => '>',
                _ => '-',
            });
        }
        track.push(']');
        track
    }

    fn summary(state: &TimerState) -> String {
        format!(
            "{} {} (cycle #{})",
            state.mode.label(),
            state.formatted_time(),
            state.cycle_count
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
