//! Daemon module for the shared Pomodoro timer.
//!
//! This module contains the server-side functionality:
//! - `timer`: Timer engine with countdown and work/break transitions
//! - `ticker`: Cancellable one-second tick driver
//! - `hub`: Client registry, command dispatch and state broadcast
//! - `server`: TCP transport with JSON line framing

pub mod hub;
pub mod server;
pub mod ticker;
pub mod timer;

pub use hub::{ConnectionId, SyncHub};
pub use server::{ServerError, SyncServer};
pub use ticker::TickDriver;
pub use timer::{TimerEngine, TimerEvent};
