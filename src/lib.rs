//! Pomodoro Express Library
//!
//! A Pomodoro timer shared by everyone connected to one server.
//! It includes:
//! - Timer engine with work/break transitions and the pyramid schedule
//! - Synchronization hub that broadcasts every change to all clients
//! - TCP server and client speaking newline-delimited JSON events
//! - CLI command parsing and display utilities
//! - Type definitions for timer state and wire messages

pub mod cli;
pub mod daemon;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{SyncHub, SyncServer, TimerEngine, TimerEvent};
pub use types::{
    ClientCommand, ModeChange, PomodoroConfig, ServerEvent, SettingsUpdate, TimerMode,
    TimerSnapshot, TimerState,
};
