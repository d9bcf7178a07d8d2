//! Per-connection session handling.
//!
//! Each accepted connection gets a reader half (parses lines, runs
//! commands, queues acks) and a spawned writer task (drains the
//! session outbox into the socket). The two halves share a child
//! cancellation token; either side failing tears the session down
//! without touching its siblings.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use winsync_proto::{INVALID_COMMAND, Inbound, ServerMessage, WireCodec, decode_line};
use winsync_types::CommandResult;

use crate::executor::Executor;
use crate::registry::{ConnectionRegistry, SessionOutbox};

/// How long a closing session waits for its writer to flush.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Unique id for one client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run one client session to completion.
///
/// Commands from this client execute strictly in arrival order; the
/// ack for each is queued before the next line is parsed. Returns when
/// the peer disconnects, the session is force-closed, or the daemon
/// shuts down.
pub async fn run_session<S>(
    stream: S,
    peer: String,
    registry: Arc<ConnectionRegistry>,
    executor: Arc<Executor>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let id = SessionId::new();
    let cancel = shutdown.child_token();
    let outbox = Arc::new(SessionOutbox::new(cancel.clone()));
    registry.register(id.clone(), Arc::clone(&outbox));
    info!("session {id} connected from {peer}");

    let framed = Framed::new(stream, WireCodec::new());
    let (mut sink, mut lines) = framed.split::<ServerMessage>();

    let writer_cancel = cancel.clone();
    let writer_outbox = Arc::clone(&outbox);
    let writer = tokio::spawn(async move {
        while let Some(msg) = writer_outbox.next().await {
            if let Err(e) = sink.send(msg).await {
                debug!("write failed, closing session: {e}");
                writer_cancel.cancel();
                break;
            }
        }
        let _ = sink.flush().await;
    });

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next() => match line {
                None => break,
                Some(Err(e)) => {
                    warn!("session {id} read error: {e}");
                    break;
                }
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode_line(&line) {
                        Inbound::Command { command, echo } => {
                            let result = executor.execute(command, echo).await;
                            if !outbox.push_ack(ServerMessage::ack(result)) {
                                break;
                            }
                        }
                        Inbound::Invalid { echo } => {
                            debug!("session {id} sent an invalid command");
                            let result = CommandResult::failed(echo, INVALID_COMMAND);
                            if !outbox.push_ack(ServerMessage::ack(result)) {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    cancel.cancel();
    registry.unregister(&id);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!("session {id} writer did not drain in time");
    }
    info!("session {id} closed");
}
