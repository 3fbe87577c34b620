//! CLI module for the shared Pomodoro timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `client`: Network client for the timer server
//! - `display`: Output formatting and display logic

pub mod client;
pub mod commands;
pub mod display;

pub use client::{Session, SyncClient};
pub use commands::{Cli, Commands, ServeArgs, SettingsArgs};
pub use display::Display;
