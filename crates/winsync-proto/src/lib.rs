//! Wire protocol definitions for winsync.
//!
//! This crate provides the message envelopes, the newline-delimited
//! JSON transport codec, and a client helper for talking to a winsync
//! server over TCP.
//!
//! # Architecture
//!
//! - [`envelope`]: `state` / `ack` / `command` message types and
//!   inbound line decoding
//! - [`transport`]: newline-delimited codec for message framing
//! - [`client`]: async client helper used by tests and tooling
//!
//! # Example
//!
//! ```no_run
//! use winsync_proto::WireClient;
//! use winsync_types::Command;
//!
//! # async fn example() -> Result<(), winsync_proto::ClientError> {
//! let mut client = WireClient::connect("127.0.0.1:8765").await?;
//! client
//!     .send(&Command::SwitchDesktop { desktop_index: 2 })
//!     .await?;
//! let ack = client.recv_ack(std::time::Duration::from_secs(5)).await?;
//! println!("result: {:?}", ack.result);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod envelope;
pub mod transport;

// Re-export main client types
pub use client::{ClientError, WireClient};

// Re-export envelope types
pub use envelope::{ClientMessage, INVALID_COMMAND, Inbound, ServerMessage, decode_line};

// Re-export transport types
pub use transport::{CodecError, WireCodec};

// Re-export the data model for convenience
pub use winsync_types::{
    Command, CommandResult, CommandStatus, DesktopRecord, MonitorRecord, MonitorRef, Rect, State,
    WindowRecord,
};
