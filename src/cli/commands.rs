//! Command definitions for the shared Pomodoro timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::cli::client::DEFAULT_SERVER_ADDR;
use crate::daemon::server::{DEFAULT_HOST, DEFAULT_PORT};
use crate::types::{PomodoroConfig, SettingsUpdate, TimerState};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro Express - a Pomodoro timer shared by everyone connected to it
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro-express",
    version,
    about = "Shared, server-synchronized Pomodoro timer",
    long_about = "One authoritative work/break countdown runs on a server.\n\
                  Every connected client sees the same timer and can start, pause,\n\
                  reset or reconfigure it for everyone.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Address of the timer server for client commands
    #[arg(
        short,
        long,
        global = true,
        env = "POMODORO_SERVER",
        default_value = DEFAULT_SERVER_ADDR
    )]
    pub server: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the authoritative timer server
    Serve(ServeArgs),

    /// Start the shared timer
    Start,

    /// Pause the shared timer
    Pause,

    /// Reset the shared timer to a fresh work session
    Reset,

    /// Change durations or pyramid mode for everyone
    Settings(SettingsArgs),

    /// Show the current timer state
    Status,

    /// Follow the shared timer live
    Watch,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Serve Command Arguments
// ============================================================================

/// Arguments for the serve command
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Initial work duration in minutes (1-60)
    #[arg(
        short,
        long,
        default_value = "25",
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub work: u32,

    /// Initial break duration in minutes (1-60)
    #[arg(
        short,
        long = "break",
        default_value = "5",
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub break_time: u32,

    /// Start with pyramid mode (work grows 5, 10, ... 30 minutes per cycle)
    #[arg(long)]
    pub pyramid: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            work: 25,
            break_time: 5,
            pyramid: false,
        }
    }
}

impl ServeArgs {
    /// Returns the socket address to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the initial timer configuration.
    pub fn config(&self) -> PomodoroConfig {
        PomodoroConfig::default()
            .with_work_minutes(self.work)
            .with_break_minutes(self.break_time)
            .with_pyramid_mode(self.pyramid)
    }
}

// ============================================================================
// Settings Command Arguments
// ============================================================================

/// Arguments for the settings command
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Work duration in minutes (1-60, ignored in pyramid mode)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub work: Option<u32>,

    /// Break duration in minutes (1-60)
    #[arg(
        short,
        long = "break",
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub break_time: Option<u32>,

    /// Turn pyramid mode on or off
    #[arg(short, long)]
    pub pyramid: Option<bool>,
}

impl SettingsArgs {
    /// Builds a settings update, keeping unspecified durations at their
    /// current values.
    ///
    /// The server resets omitted durations to defaults, so both are always
    /// sent.
    pub fn to_update(&self, current: &TimerState) -> SettingsUpdate {
        let work = self.work.unwrap_or(current.work_duration / 60);
        let break_time = self.break_time.unwrap_or(current.break_duration / 60);

        let update = SettingsUpdate::default()
            .with_work_minutes(i64::from(work))
            .with_break_minutes(i64::from(break_time));

        match self.pyramid {
            Some(enabled) => update.with_pyramid_mode(enabled),
            None => update,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
