//! Async client helper for the winsync wire protocol.
//!
//! A thin wrapper over a framed TCP stream: send commands, receive
//! state pushes and acks. Used by the daemon's integration tests and
//! by small tooling; dashboard clients in other languages speak the
//! same newline-delimited JSON directly.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;
use tracing::debug;

use winsync_types::Command;

use crate::envelope::{ClientMessage, ServerMessage};
use crate::transport::{CodecError, WireCodec};

/// Errors surfaced by [`WireClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("connection closed by server")]
    Closed,

    #[error("timed out waiting for a message")]
    Timeout,
}

/// A connected protocol client.
pub struct WireClient {
    framed: Framed<TcpStream, WireCodec>,
}

impl WireClient {
    /// Connect to a winsync server.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection cannot be established.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        debug!("connected to {:?}", stream.peer_addr().ok());
        Ok(Self {
            framed: Framed::new(stream, WireCodec::new()),
        })
    }

    /// Send one command in its wire envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        let msg = ClientMessage::command(command)?;
        self.framed.send(msg).await?;
        Ok(())
    }

    /// Send a raw line, bypassing command serialization. Lets tests
    /// exercise the server's malformed-input path.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn send_raw(&mut self, line: &str) -> Result<(), ClientError> {
        self.framed.send(line.to_string()).await?;
        Ok(())
    }

    /// Receive the next server message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] on EOF, or a codec/JSON error
    /// for an unreadable frame.
    pub async fn recv(&mut self) -> Result<ServerMessage, ClientError> {
        let line = self.framed.next().await.ok_or(ClientError::Closed)??;
        Ok(serde_json::from_str(&line)?)
    }

    /// Receive the next server message, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] if nothing arrives in time.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<ServerMessage, ClientError> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Receive messages until an ack arrives, returning it. State
    /// pushes seen along the way are discarded. The whole wait is
    /// bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] if no ack arrives in time.
    pub async fn recv_ack(
        &mut self,
        timeout: Duration,
    ) -> Result<winsync_types::CommandResult, ClientError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .ok_or(ClientError::Timeout)?;
            if let ServerMessage::Ack { payload } = self.recv_timeout(remaining).await? {
                return Ok(payload);
            }
        }
    }
}
