//! TCP server for the shared Pomodoro timer.
//!
//! This module provides the network transport:
//! - Listener that accepts any number of clients
//! - Newline-delimited JSON framing shared with the CLI client
//! - Per-connection task that feeds commands to the [`SyncHub`] and
//!   drains the client's event outbox back onto the socket

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::types::ClientCommand;

use super::hub::{ConnectionId, SyncHub};

// ============================================================================
// Constants
// ============================================================================

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default listening host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Maximum frame size in bytes (4KB), excluding the newline
pub const MAX_FRAME_SIZE: usize = 4096;

/// Back-off after a failed accept
const ACCEPT_RETRY_DELAY_MS: u64 = 100;

// ============================================================================
// ServerError
// ============================================================================

/// Transport-level error types.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Read error
    #[error("Failed to read frame: {0}")]
    ReadError(String),

    /// Write error
    #[error("Failed to write frame: {0}")]
    WriteError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Frame too large
    #[error("Frame too large (max {MAX_FRAME_SIZE} bytes)")]
    FrameTooLarge,
}

// ============================================================================
// Framing
// ============================================================================

/// Reads one newline-terminated frame.
///
/// Returns `Ok(None)` at end of stream. A trailing frame without a newline
/// is still returned. Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
///
/// Returns an error if reading fails or the frame exceeds [`MAX_FRAME_SIZE`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<String>, ServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    let limit = MAX_FRAME_SIZE as u64 + 1;

    let n = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut buffer)
        .await
        .map_err(|e| ServerError::ReadError(e.to_string()))?;

    if n == 0 {
        return Ok(None);
    }

    if buffer.last() == Some(&b'\n') {
        buffer.pop();
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
    } else if buffer.len() > MAX_FRAME_SIZE {
        return Err(ServerError::FrameTooLarge);
    }

    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

/// Serializes a message as one JSON line and flushes it.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json =
        serde_json::to_vec(message).map_err(|e| ServerError::SerializationError(e.to_string()))?;
    json.push(b'\n');

    writer
        .write_all(&json)
        .await
        .map_err(|e| ServerError::WriteError(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| ServerError::WriteError(e.to_string()))?;

    Ok(())
}

// ============================================================================
// SyncServer
// ============================================================================

/// TCP server that exposes a [`SyncHub`] to network clients.
pub struct SyncServer {
    /// TCP listener
    listener: TcpListener,
    /// Shared timer hub
    hub: Arc<SyncHub>,
}

impl SyncServer {
    /// Binds the server to the given address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(addr: &str, hub: Arc<SyncHub>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        Ok(Self { listener, hub })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Returns the hub served by this server.
    pub fn hub(&self) -> &Arc<SyncHub> {
        &self.hub
    }

    /// Accepts connections forever, serving each on its own task.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted connection");
                    tokio::spawn(serve_connection(stream, self.hub.clone()));
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(ACCEPT_RETRY_DELAY_MS)).await;
                }
            }
        }
    }

    /// Serves until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutting down server");
                Ok(())
            }
        }
    }
}

// ============================================================================
// Connection handling
// ============================================================================

/// Serves one client until it disconnects.
///
/// The client is registered with the hub for the lifetime of the socket.
/// Oversized frames and failed writes end the connection; malformed
/// commands are logged and skipped.
pub async fn serve_connection(stream: TcpStream, hub: Arc<SyncHub>) {
    let (read_half, mut write_half) = stream.into_split();
    let (id, mut events) = hub.connect().await;

    let mut writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(e) = write_frame(&mut write_half, &event).await {
                debug!(%id, "Stopping delivery: {}", e);
                break;
            }
        }
    });

    let mut reader = BufReader::new(read_half);
    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(Some(line)) => dispatch_frame(&hub, id, &line).await,
                Ok(None) => break,
                Err(e) => {
                    warn!(%id, "Closing connection: {}", e);
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    hub.disconnect(id).await;
    writer.abort();
}

/// Parses a frame and hands the command to the hub.
async fn dispatch_frame(hub: &SyncHub, id: ConnectionId, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    match serde_json::from_str::<ClientCommand>(line) {
        Ok(command) => {
            debug!(%id, command = command.name(), "Received command");
            hub.handle(id, command).await;
        }
        Err(e) => warn!(%id, "Ignoring malformed frame: {}", e),
    }
}

// ============================================================================
// Tests
// ============================================================================
