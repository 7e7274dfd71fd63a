//! Connection management and the background listener.

use crate::error::ClientError;
use crate::mailbox::Mailbox;
use rdtp_protocol::{Command, Decoder, Encoder, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Capacity of the bounded push buffer. Push delivery must never stall frame
/// reads; on overflow the oldest messages are dropped and the consumer is
/// told how many it missed.
const PUSH_CHANNEL_CAPACITY: usize = 256;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server address, `host:port`. Resolved at connect time.
    pub addr: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-request response timeout.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(3),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

/// A connection to an RDTP chat server.
///
/// The socket is exclusively owned here: only the listener reads it and only
/// the dispatcher writes to it. All inbound traffic flows through
/// [`read_loop`](Connection::read_loop), which classifies each frame as a
/// correlated response (into the [`Mailbox`]) or a push message (into the
/// bounded push buffer).
pub struct Connection {
    config: ConnectConfig,
    /// Write half of the stream (for sending commands).
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Read half of the stream (owned by the listener).
    reader: Mutex<Option<OwnedReadHalf>>,
    /// Decoder for parsing inbound frames.
    decoder: Mutex<Decoder>,
    /// Single-slot handoff for the one outstanding request.
    mailbox: Mailbox,
    /// Is the connection established?
    connected: AtomicBool,
    /// Bounded buffer for server-pushed chat messages.
    pushes: broadcast::Sender<String>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectConfig) -> Self {
        let (pushes, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            decoder: Mutex::new(Decoder::new()),
            mailbox: Mailbox::new(),
            connected: AtomicBool::new(false),
            pushes,
        }
    }

    /// Subscribes to server-pushed chat messages.
    ///
    /// A subscriber that falls behind loses the oldest messages and receives
    /// a `Lagged` error telling it how many were dropped.
    pub fn subscribe_pushes(&self) -> broadcast::Receiver<String> {
        self.pushes.subscribe()
    }

    /// Returns the response correlator for this connection.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Returns the per-request response timeout.
    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("connecting to {}...", self.config.addr);

        let tcp_stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("connection failed: {}", e);
            ClientError::Io(e)
        })?;

        tcp_stream.set_nodelay(true).ok();

        let (read_half, write_half) = tcp_stream.into_split();
        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(read_half);
        self.decoder.lock().await.clear();
        self.mailbox.reset();
        self.connected.store(true, Ordering::SeqCst);

        tracing::debug!("connected to {}", self.config.addr);
        Ok(())
    }

    /// Sends a command frame. The dispatcher is the only writer, so writes
    /// need no ordering beyond the writer lock.
    pub async fn send(&self, command: &Command) -> Result<(), ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }

        let encoded = Encoder::encode_command(command)?;

        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        if let Err(e) = writer.write_all(&encoded).await {
            // A write failure means the transport is gone for everyone
            drop(writer_guard);
            self.mark_disconnected();
            return Err(ClientError::Io(e));
        }

        tracing::debug!(action = ?command.action, bytes = encoded.len(), "command sent");
        Ok(())
    }

    /// Reads and classifies inbound frames (run this in a background task).
    ///
    /// Responses go to the mailbox; pushes go to the push buffer. A malformed
    /// frame is reported and skipped, never fatal. A read error or EOF ends
    /// the loop, marking the connection disconnected and waking any mailbox
    /// waiter.
    pub async fn read_loop(&self) -> Result<(), ClientError> {
        tracing::debug!("listener started");
        let mut buf = vec![0u8; self.config.read_buffer_size];

        loop {
            let read = {
                let mut reader_guard = self.reader.lock().await;
                let reader = reader_guard.as_mut().ok_or(ClientError::NotConnected)?;
                reader.read(&mut buf).await
            };

            let n = match read {
                Ok(0) => {
                    tracing::debug!("listener: peer closed the connection");
                    self.mark_disconnected();
                    return Err(ClientError::Disconnected);
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("listener: read failed: {}", e);
                    self.mark_disconnected();
                    return Err(ClientError::Io(e));
                }
            };

            let mut decoder = self.decoder.lock().await;
            decoder.extend(&buf[..n]);

            loop {
                match decoder.decode_message() {
                    Ok(Some(Message::Response(response))) => {
                        if let Err(rejected) = self.mailbox.deliver(response) {
                            // Server sent a response nobody asked for (or the
                            // asker timed out); report and discard.
                            tracing::warn!(
                                status = ?rejected.status,
                                "unsolicited response discarded"
                            );
                        }
                    }
                    Ok(Some(Message::Push(push))) => {
                        // Send never blocks; overflow drops the oldest entry
                        let _ = self.pushes.send(push.payload);
                    }
                    Ok(Some(Message::Command(command))) => {
                        tracing::warn!(
                            action = ?command.action,
                            "server sent a command frame; discarded"
                        );
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("malformed frame: {}", e);
                        if !e.consumed_frame() {
                            // Header-level damage; drop buffered bytes and
                            // resynchronize from the next read.
                            decoder.clear();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection. Idempotent.
    ///
    /// Any dispatcher blocked on the mailbox resolves with `Disconnected`
    /// rather than hanging.
    pub async fn close(&self) {
        tracing::debug!("closing connection");
        self.mark_disconnected();

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        let _ = self.reader.lock().await.take();
    }

    /// Marks the transport as gone and releases any mailbox waiter.
    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.mailbox.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ConnectConfig::new("127.0.0.1:7667");
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_config_buffer_clamping() {
        let config = ConnectConfig::new("127.0.0.1:7667").with_read_buffer_size(100);
        assert_eq!(config.read_buffer_size, MIN_READ_BUFFER_SIZE);

        let config = ConnectConfig::new("127.0.0.1:7667").with_read_buffer_size(10 * 1024 * 1024);
        assert_eq!(config.read_buffer_size, MAX_READ_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let conn = Connection::new(ConnectConfig::new("127.0.0.1:7667"));
        let command = Command::new(rdtp_protocol::Action::UsersOnline);
        assert!(matches!(
            conn.send(&command).await,
            Err(ClientError::NotConnected)
        ));
    }
}
