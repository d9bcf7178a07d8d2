//! Error types for the winsync daemon.

use crate::adapter::AdapterError;

/// Errors that can occur in the daemon.
///
/// Per-session and per-command failures never surface here; they are
/// converted to degraded samples or error acks at their boundary. The
/// only unrecoverable variant in practice is [`DaemonError::Bind`].
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Failed to bind the listening endpoint at startup
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment adapter error
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Codec error
    #[error("codec error: {0}")]
    Codec(#[from] winsync_proto::CodecError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
