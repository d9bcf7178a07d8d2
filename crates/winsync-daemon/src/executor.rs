//! Command execution.
//!
//! Turns one parsed [`Command`] into at most one adapter action and
//! exactly one [`CommandResult`]. Validation failures, adapter errors
//! and timeouts all come back as error acks carrying the client's
//! original payload; nothing here ever takes the daemon down.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use winsync_types::{Command, CommandResult};

use crate::adapter::{EnvironmentAdapter, WorkspaceAction};
use crate::registry::ConnectionRegistry;

/// Default cap on how long one adapter action may run.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes commands against the environment adapter.
pub struct Executor {
    adapter: Arc<dyn EnvironmentAdapter>,
    registry: Arc<ConnectionRegistry>,
    action_timeout: Duration,
}

impl Executor {
    #[must_use]
    pub fn new(adapter: Arc<dyn EnvironmentAdapter>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            adapter,
            registry,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Execute one command. `echo` is the client's payload as received
    /// and is reflected back verbatim in the ack.
    pub async fn execute(&self, command: Command, echo: Value) -> CommandResult {
        if let Err(reason) = self.validate(&command) {
            debug!("rejecting {}: {reason}", command.name());
            return CommandResult::failed(echo, reason);
        }

        let action = action_for(&command);
        match tokio::time::timeout(self.action_timeout, self.adapter.perform(&action)).await {
            Ok(Ok(())) => {
                debug!("executed {}", command.name());
                CommandResult::ok(echo)
            }
            Ok(Err(e)) => {
                warn!("command {} failed: {e}", command.name());
                CommandResult::failed(echo, e.to_string())
            }
            Err(_) => {
                warn!("command {} timed out", command.name());
                CommandResult::failed(echo, "timeout")
            }
        }
    }

    /// Cheap structural checks before touching the environment.
    fn validate(&self, command: &Command) -> Result<(), String> {
        if let Some(window_id) = command.window_id()
            && window_id.trim().is_empty()
        {
            return Err("empty window id".to_string());
        }

        let desktop_index = match command {
            Command::SwitchDesktop { desktop_index }
            | Command::MoveWindowToDesktop { desktop_index, .. } => Some(*desktop_index),
            _ => None,
        };
        if let Some(index) = desktop_index {
            if index == 0 {
                return Err("desktop index is 1-based".to_string());
            }
            // Only enforce the upper bound when a snapshot told us one.
            if let Some(count) = self.registry.desktop_count()
                && count > 0
            {
                let count = u32::try_from(count).unwrap_or(u32::MAX);
                if index > count {
                    return Err(format!("desktop index {index} out of range (1..={count})"));
                }
            }
        }
        Ok(())
    }
}

/// Map a command to its adapter action. Total: every command variant
/// has exactly one action.
fn action_for(command: &Command) -> WorkspaceAction {
    match command {
        Command::ActivateWindow { window_id } => WorkspaceAction::Activate {
            window_id: window_id.clone(),
        },
        Command::CloseWindow { window_id } => WorkspaceAction::Close {
            window_id: window_id.clone(),
        },
        Command::Minimize { window_id } => WorkspaceAction::Minimize {
            window_id: window_id.clone(),
        },
        Command::Maximize { window_id } => WorkspaceAction::Maximize {
            window_id: window_id.clone(),
        },
        Command::Restore { window_id } => WorkspaceAction::Restore {
            window_id: window_id.clone(),
        },
        Command::Fullscreen { window_id } => WorkspaceAction::Fullscreen {
            window_id: window_id.clone(),
        },
        Command::FullscreenExit { window_id } => WorkspaceAction::FullscreenExit {
            window_id: window_id.clone(),
        },
        Command::PinToggle { window_id } => WorkspaceAction::PinToggle {
            window_id: window_id.clone(),
        },
        Command::SwitchDesktop { desktop_index } => WorkspaceAction::SwitchDesktop {
            index: *desktop_index,
        },
        Command::MoveWindowToDesktop {
            window_id,
            desktop_index,
        } => WorkspaceAction::MoveToDesktop {
            window_id: window_id.clone(),
            index: *desktop_index,
        },
        Command::MoveWindowToMonitor {
            window_id,
            monitor_ref,
        } => WorkspaceAction::MoveToMonitor {
            window_id: window_id.clone(),
            target: monitor_ref.clone(),
        },
    }
}
