//! Environment adapter boundary.
//!
//! Everything the daemon knows about the windowing environment goes
//! through [`EnvironmentAdapter`]. The production implementation drives
//! KWin over D-Bus ([`kwin::KwinAdapter`]); tests use [`StubAdapter`].
//! Adapter failures never propagate as faults: the sampler degrades the
//! failing category and the executor reports a failed ack.

mod kwin;
mod stub;

use async_trait::async_trait;

use winsync_types::{DesktopRecord, MonitorRecord, MonitorRef, WindowRecord};

pub use kwin::KwinAdapter;
pub use stub::StubAdapter;

/// Errors from the environment boundary.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("D-Bus error: {0}")]
    Dbus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("environment produced no usable output")]
    NoOutput,

    #[error("{0}")]
    Failed(String),
}

impl From<zbus::Error> for AdapterError {
    fn from(err: zbus::Error) -> Self {
        AdapterError::Dbus(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// One imperative action against the windowing environment.
///
/// This is the single entry point for every command; the executor
/// issues at most one of these per inbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceAction {
    Activate { window_id: String },
    Close { window_id: String },
    Minimize { window_id: String },
    Maximize { window_id: String },
    Restore { window_id: String },
    Fullscreen { window_id: String },
    FullscreenExit { window_id: String },
    PinToggle { window_id: String },
    SwitchDesktop { index: u32 },
    MoveToDesktop { window_id: String, index: u32 },
    MoveToMonitor { window_id: String, target: MonitorRef },
}

/// Query and control surface of the windowing environment.
///
/// Each query may fail or time out independently; a failure degrades
/// only that category of the sample.
#[async_trait]
pub trait EnvironmentAdapter: Send + Sync {
    /// List managed windows, optionally restricted to one process.
    async fn list_windows(&self, filter_pid: Option<i32>) -> Result<Vec<WindowRecord>>;

    /// List virtual desktops.
    async fn list_desktops(&self) -> Result<Vec<DesktopRecord>>;

    /// List monitors/outputs.
    async fn list_monitors(&self) -> Result<Vec<MonitorRecord>>;

    /// Perform one imperative action. Best effort, at most once.
    async fn perform(&self, action: &WorkspaceAction) -> Result<()>;
}
