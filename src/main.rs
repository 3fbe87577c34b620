//! Pomodoro Express - a Pomodoro timer shared over the network
//!
//! One server owns the countdown; everyone connected sees the same timer:
//! - `serve` runs the authoritative timer
//! - `start`, `pause`, `reset` and `settings` control it for everyone
//! - `status` and `watch` show it

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{info, warn};

use pomodoro_express::cli::{Cli, Commands, Display, ServeArgs, SyncClient};
use pomodoro_express::daemon::{SyncHub, SyncServer};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let client = SyncClient::new(cli.server.clone());

    match cli.command {
        Some(Commands::Serve(args)) => {
            serve(&args).await?;
        }
        Some(Commands::Start) => {
            let snapshot = client.start().await?;
            Display::show_start_success(&snapshot);
        }
        Some(Commands::Pause) => {
            let snapshot = client.pause().await?;
            Display::show_pause_success(&snapshot);
        }
        Some(Commands::Reset) => {
            let snapshot = client.reset().await?;
            Display::show_reset_success(&snapshot);
        }
        Some(Commands::Settings(args)) => {
            let snapshot = client.update_settings(&args).await?;
            Display::show_settings_success(&snapshot);
        }
        Some(Commands::Status) => {
            let snapshot = client.status().await?;
            Display::show_status(&snapshot);
        }
        Some(Commands::Watch) => {
            tokio::select! {
                result = client.watch(Display::show_event) => {
                    println!();
                    result?;
                    println!("Server closed the connection");
                }
                _ = tokio::signal::ctrl_c() => println!(),
            }
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Runs the timer server until Ctrl-C.
async fn serve(args: &ServeArgs) -> Result<()> {
    let hub = SyncHub::new(args.config());
    let server = SyncServer::bind(&args.address(), hub).await?;
    let addr = server.local_addr()?;

    info!(%addr, "Server running");
    Display::show_serving(addr);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
