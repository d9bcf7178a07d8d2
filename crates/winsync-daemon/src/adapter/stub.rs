//! Scriptable in-memory adapter for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use winsync_types::{DesktopRecord, MonitorRecord, WindowRecord};

use super::{AdapterError, EnvironmentAdapter, Result, WorkspaceAction};

/// Test double for [`EnvironmentAdapter`].
///
/// Returns fixed record lists, records every performed action, and can
/// be told to fail individual categories or delay every call.
#[derive(Default)]
pub struct StubAdapter {
    windows: Mutex<Vec<WindowRecord>>,
    desktops: Mutex<Vec<DesktopRecord>>,
    monitors: Mutex<Vec<MonitorRecord>>,
    actions: Mutex<Vec<WorkspaceAction>>,
    fail_windows: Mutex<bool>,
    fail_desktops: Mutex<bool>,
    fail_monitors: Mutex<bool>,
    fail_actions: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

impl StubAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_windows(self, windows: Vec<WindowRecord>) -> Self {
        *self.windows.lock().unwrap() = windows;
        self
    }

    #[must_use]
    pub fn with_desktops(self, desktops: Vec<DesktopRecord>) -> Self {
        *self.desktops.lock().unwrap() = desktops;
        self
    }

    #[must_use]
    pub fn with_monitors(self, monitors: Vec<MonitorRecord>) -> Self {
        *self.monitors.lock().unwrap() = monitors;
        self
    }

    pub fn fail_windows(&self, fail: bool) {
        *self.fail_windows.lock().unwrap() = fail;
    }

    pub fn fail_desktops(&self, fail: bool) {
        *self.fail_desktops.lock().unwrap() = fail;
    }

    pub fn fail_monitors(&self, fail: bool) {
        *self.fail_monitors.lock().unwrap() = fail;
    }

    /// Make every `perform` call fail with the given reason.
    pub fn fail_actions(&self, reason: Option<&str>) {
        *self.fail_actions.lock().unwrap() = reason.map(String::from);
    }

    /// Delay every adapter call, to exercise timeout paths.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Actions performed so far, in order.
    #[must_use]
    pub fn performed(&self) -> Vec<WorkspaceAction> {
        self.actions.lock().unwrap().clone()
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl EnvironmentAdapter for StubAdapter {
    async fn list_windows(&self, filter_pid: Option<i32>) -> Result<Vec<WindowRecord>> {
        self.maybe_delay().await;
        if *self.fail_windows.lock().unwrap() {
            return Err(AdapterError::NoOutput);
        }
        let windows = self.windows.lock().unwrap().clone();
        Ok(match filter_pid {
            Some(pid) => windows.into_iter().filter(|w| w.pid == Some(pid)).collect(),
            None => windows,
        })
    }

    async fn list_desktops(&self) -> Result<Vec<DesktopRecord>> {
        self.maybe_delay().await;
        if *self.fail_desktops.lock().unwrap() {
            return Err(AdapterError::NoOutput);
        }
        Ok(self.desktops.lock().unwrap().clone())
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorRecord>> {
        self.maybe_delay().await;
        if *self.fail_monitors.lock().unwrap() {
            return Err(AdapterError::NoOutput);
        }
        Ok(self.monitors.lock().unwrap().clone())
    }

    async fn perform(&self, action: &WorkspaceAction) -> Result<()> {
        self.maybe_delay().await;
        if let Some(reason) = self.fail_actions.lock().unwrap().clone() {
            return Err(AdapterError::Failed(reason));
        }
        self.actions.lock().unwrap().push(action.clone());
        Ok(())
    }
}
