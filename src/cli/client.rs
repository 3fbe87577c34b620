//! Network client for the shared Pomodoro timer server.
//!
//! This module provides:
//! - TCP connection with timeout and retry logic
//! - Command sending with the resulting state read back
//! - Live event streaming for `watch`

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::cli::commands::SettingsArgs;
use crate::daemon::server::{read_frame, write_frame};
use crate::types::{ClientCommand, ServerEvent, TimerSnapshot};

// ============================================================================
// Constants
// ============================================================================

/// Default server address
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// How long to wait for the state update a command produces
const COMMAND_SETTLE_MS: u64 = 1500;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// Session
// ============================================================================

/// An open connection to the timer server.
pub struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    fn new(stream: TcpStream) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    /// Reads the next event, or `None` once the server closes the connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        let Some(line) = read_frame(&mut self.reader).await? else {
            return Ok(None);
        };

        let event = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse server event: {}", line))?;
        Ok(Some(event))
    }

    /// Waits for the next full timer update, skipping other events.
    ///
    /// Returns `None` if nothing arrives within `wait`.
    pub async fn next_snapshot(&mut self, wait: Duration) -> Result<Option<TimerSnapshot>> {
        match timeout(wait, self.read_snapshot()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn read_snapshot(&mut self) -> Result<TimerSnapshot> {
        loop {
            match self.next_event().await? {
                Some(ServerEvent::TimerUpdate(snapshot)) => return Ok(snapshot),
                Some(_) => continue,
                None => anyhow::bail!("Server closed the connection"),
            }
        }
    }

    /// Sends a command to the server.
    pub async fn send(&mut self, command: &ClientCommand) -> Result<()> {
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            write_frame(&mut self.writer, command),
        )
        .await
        .context("Timed out sending command")?
        .context("Failed to send command")
    }
}

// ============================================================================
// SyncClient
// ============================================================================

/// Client for the timer server.
pub struct SyncClient {
    /// Server address
    addr: String,
    /// Connection timeout
    timeout: Duration,
    /// Wait for a command's resulting update
    settle: Duration,
}

impl SyncClient {
    /// Creates a new client for the given server address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            settle: Duration::from_millis(COMMAND_SETTLE_MS),
        }
    }

    /// Overrides how long a command waits for its resulting update.
    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Returns the server address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Connects to the server, retrying with linear back-off.
    pub async fn connect(&self) -> Result<Session> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.connect_once().await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    tracing::warn!(
                        "Connection failed (attempt {}/{}): {:#}",
                        attempt,
                        MAX_RETRIES,
                        e
                    );
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No connection attempts made")))
    }

    async fn connect_once(&self) -> Result<Session> {
        let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .context("Connection timed out")?
            .with_context(|| {
                format!(
                    "Could not connect to {}. Is 'pomodoro-express serve' running?",
                    self.addr
                )
            })?;

        Ok(Session::new(stream))
    }

    /// Fetches the current timer state.
    pub async fn status(&self) -> Result<TimerSnapshot> {
        let mut session = self.connect().await?;
        Self::initial_snapshot(&mut session).await
    }

    /// Starts the shared timer.
    pub async fn start(&self) -> Result<TimerSnapshot> {
        self.send_command(ClientCommand::StartTimer).await
    }

    /// Pauses the shared timer.
    pub async fn pause(&self) -> Result<TimerSnapshot> {
        self.send_command(ClientCommand::PauseTimer).await
    }

    /// Resets the shared timer.
    pub async fn reset(&self) -> Result<TimerSnapshot> {
        self.send_command(ClientCommand::ResetTimer).await
    }

    /// Updates settings, keeping unspecified durations as they are.
    pub async fn update_settings(&self, args: &SettingsArgs) -> Result<TimerSnapshot> {
        let mut session = self.connect().await?;
        let current = Self::initial_snapshot(&mut session).await?;
        let command = ClientCommand::UpdateSettings(args.to_update(&current.state));
        self.apply(session, current, command).await
    }

    /// Sends a command and returns the state the server broadcast after it.
    ///
    /// Redundant commands produce no broadcast; the state read on connect is
    /// returned in that case.
    pub async fn send_command(&self, command: ClientCommand) -> Result<TimerSnapshot> {
        let mut session = self.connect().await?;
        let current = Self::initial_snapshot(&mut session).await?;
        self.apply(session, current, command).await
    }

    /// Streams every event to `on_event` until the server closes.
    pub async fn watch<F>(&self, mut on_event: F) -> Result<()>
    where
        F: FnMut(&ServerEvent),
    {
        let mut session = self.connect().await?;
        while let Some(event) = session.next_event().await? {
            on_event(&event);
        }
        Ok(())
    }

    async fn apply(
        &self,
        mut session: Session,
        current: TimerSnapshot,
        command: ClientCommand,
    ) -> Result<TimerSnapshot> {
        session.send(&command).await?;
        let updated = session.next_snapshot(self.settle).await?;
        Ok(updated.unwrap_or(current))
    }

    async fn initial_snapshot(session: &mut Session) -> Result<TimerSnapshot> {
        session
            .next_snapshot(Duration::from_secs(IO_TIMEOUT_SECS))
            .await?
            .context("Server did not send the timer state")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    use crate::types::{TimerMode, TimerState};

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn snapshot(state: TimerState) -> ServerEvent {
        ServerEvent::TimerUpdate(TimerSnapshot::from_timer_state(&state))
    }

    /// Mock server that greets like the real one and records the first command.
    async fn create_mock_server(
        reply: Option<TimerState>,
    ) -> (String, tokio::task::JoinHandle<Option<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();

            write_frame(&mut write_half, &ServerEvent::UserCountUpdate(1))
                .await
                .unwrap();
            write_frame(&mut write_half, &snapshot(TimerState::default()))
                .await
                .unwrap();

            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();

            if let Some(state) = reply {
                write_frame(&mut write_half, &snapshot(state)).await.unwrap();
            }
            // Hold the connection open until the client hangs up.
            let mut rest = String::new();
            let _ = reader.read_line(&mut rest).await;

            (!line.is_empty()).then(|| line.trim().to_string())
        });

        (addr, handle)
    }

    // ------------------------------------------------------------------------
    // SyncClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_new_client() {
            let client = SyncClient::new("127.0.0.1:4000");
            assert_eq!(client.addr(), "127.0.0.1:4000");
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let client = SyncClient::new("127.0.0.1:1");

            let result = client.status().await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_status_reads_initial_state() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap().to_string();
            tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                write_frame(&mut stream, &ServerEvent::UserCountUpdate(3))
                    .await
                    .unwrap();
                write_frame(&mut stream, &snapshot(TimerState::default()))
                    .await
                    .unwrap();
            });

            let status = SyncClient::new(addr).status().await.unwrap();

            assert_eq!(status.formatted_time, "25:00");
            assert_eq!(status.state.mode, TimerMode::Work);
        }

        #[tokio::test]
        async fn test_start_sends_command_and_returns_update() {
            let running = TimerState {
                is_running: true,
                ..TimerState::default()
            };
            let (addr, server) = create_mock_server(Some(running)).await;

            let result = SyncClient::new(addr).start().await.unwrap();

            assert!(result.state.is_running);
            assert_eq!(
                server.await.unwrap().as_deref(),
                Some(r#"{"event":"start-timer"}"#)
            );
        }

        #[tokio::test]
        async fn test_redundant_command_returns_initial_state() {
            let (addr, _server) = create_mock_server(None).await;
            let client = SyncClient::new(addr).with_settle_time(Duration::from_millis(100));

            let result = client.pause().await.unwrap();

            assert_eq!(result.state, TimerState::default());
        }

        #[tokio::test]
        async fn test_update_settings_fills_current_values() {
            let (addr, server) = create_mock_server(None).await;
            let client = SyncClient::new(addr).with_settle_time(Duration::from_millis(100));
            let args = SettingsArgs {
                break_time: Some(15),
                ..SettingsArgs::default()
            };

            client.update_settings(&args).await.unwrap();

            let sent = server.await.unwrap().unwrap();
            let command: ClientCommand = serde_json::from_str(&sent).unwrap();
            match command {
                ClientCommand::UpdateSettings(update) => {
                    assert_eq!(update.work_minutes(), Some(25));
                    assert_eq!(update.break_minutes(), Some(15));
                }
                other => panic!("Expected UpdateSettings, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_watch_collects_events_until_close() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap().to_string();
            tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                write_frame(&mut stream, &ServerEvent::UserCountUpdate(2))
                    .await
                    .unwrap();
                write_frame(&mut stream, &snapshot(TimerState::default()))
                    .await
                    .unwrap();
            });

            let mut events = Vec::new();
            SyncClient::new(addr)
                .watch(|event| events.push(event.clone()))
                .await
                .unwrap();

            assert_eq!(events.len(), 2);
            assert_eq!(events[0], ServerEvent::UserCountUpdate(2));
        }
    }
}
