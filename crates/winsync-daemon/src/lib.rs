//! Winsync daemon library.
//!
//! Samples window, desktop and monitor state from the compositor on a
//! fixed cadence, broadcasts JSON snapshots to every connected TCP
//! client, and executes inbound window-management commands with one
//! ack per command.

pub mod adapter;
pub mod error;
pub mod executor;
pub(crate) mod queue;
pub mod registry;
pub mod sampler;
pub(crate) mod scheduler;
pub mod server;
pub mod session;

pub use adapter::{AdapterError, EnvironmentAdapter, KwinAdapter, StubAdapter, WorkspaceAction};
pub use error::{DaemonError, Result};
pub use executor::Executor;
pub use registry::ConnectionRegistry;
pub use sampler::{Sample, Sampler};
pub use server::{Server, ServerConfig, TEARDOWN_TIMEOUT};
pub use session::SessionId;
