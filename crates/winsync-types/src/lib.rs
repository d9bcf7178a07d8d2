//! Shared types for winsync components.
//!
//! This crate provides the data model used across winsync-proto and
//! winsync-daemon: window/desktop/monitor records, the sampled `State`,
//! and the command/result pair exchanged with remote clients. All types
//! are serializable for wire transport.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Deserialize an index that may arrive as a JSON number or a numeric
/// string (older dashboard clients send `"targetDesktop": "2"`).
fn deserialize_lenient_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Screen-space rectangle (position + size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One managed window as seen at sampling time.
///
/// Immutable once constructed; a new sample produces wholly new records.
/// `id` is environment-assigned and stable for the window's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub id: String,
    pub title: String,
    /// Raw window caption as reported by the environment; `title` may be
    /// the nicer application name when the environment knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    /// 1-based desktop indices this window appears on.
    pub desktops: Vec<u32>,
    pub on_all_desktops: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Rect>,
    pub minimized: bool,
    pub maximized: bool,
    pub fullscreen: bool,
    pub active: bool,
}

/// One virtual desktop. Indices are 1-based and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopRecord {
    pub index: u32,
    pub name: String,
    pub current: bool,
}

/// One monitor/output. Indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub index: u32,
    pub name: String,
    pub geometry: Rect,
    pub primary: bool,
}

/// A full sampled snapshot of the window-management environment.
///
/// Invariant (best effort): at most one desktop has `current == true`.
/// Window desktop/monitor references resolve against the accompanying
/// lists at sampling time; a stale reference from a race with the
/// environment is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub windows: Vec<WindowRecord>,
    pub desktops: Vec<DesktopRecord>,
    pub monitors: Vec<MonitorRecord>,
    /// Sampling time, seconds since the Unix epoch.
    pub timestamp: f64,
}

impl State {
    #[must_use]
    pub fn desktop_count(&self) -> usize {
        self.desktops.len()
    }

    #[must_use]
    pub fn current_desktop(&self) -> Option<&DesktopRecord> {
        self.desktops.iter().find(|d| d.current)
    }

    #[must_use]
    pub fn window(&self, id: &str) -> Option<&WindowRecord> {
        self.windows.iter().find(|w| w.id == id)
    }
}

/// Monitor reference on the wire: 1-based index or output name ("DP-2").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonitorRef {
    Index(u32),
    Name(String),
}

impl std::fmt::Display for MonitorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorRef::Index(n) => write!(f, "{n}"),
            MonitorRef::Name(s) => write!(f, "{s}"),
        }
    }
}

/// A control command, decided once at parse time.
///
/// Wire `name` values match the documented command set; the `*Event`
/// aliases keep older dashboard clients working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all_fields = "camelCase")]
pub enum Command {
    ActivateWindow {
        window_id: String,
    },
    #[serde(alias = "CloseEvent")]
    CloseWindow {
        window_id: String,
    },
    #[serde(alias = "MinimizeEvent")]
    Minimize {
        window_id: String,
    },
    #[serde(alias = "MaximizeEvent")]
    Maximize {
        window_id: String,
    },
    #[serde(alias = "RestoreEvent")]
    Restore {
        window_id: String,
    },
    #[serde(alias = "FullscreenEvent")]
    Fullscreen {
        window_id: String,
    },
    #[serde(alias = "FullscreenExitEvent")]
    FullscreenExit {
        window_id: String,
    },
    #[serde(alias = "PinToggleEvent")]
    PinToggle {
        window_id: String,
    },
    SwitchDesktop {
        #[serde(deserialize_with = "deserialize_lenient_index")]
        desktop_index: u32,
    },
    #[serde(alias = "MoveWindow")]
    MoveWindowToDesktop {
        window_id: String,
        #[serde(
            alias = "targetDesktop",
            deserialize_with = "deserialize_lenient_index"
        )]
        desktop_index: u32,
    },
    MoveWindowToMonitor {
        window_id: String,
        #[serde(alias = "targetMonitor")]
        monitor_ref: MonitorRef,
    },
}

impl Command {
    /// Wire name of this command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::ActivateWindow { .. } => "ActivateWindow",
            Command::CloseWindow { .. } => "CloseWindow",
            Command::Minimize { .. } => "Minimize",
            Command::Maximize { .. } => "Maximize",
            Command::Restore { .. } => "Restore",
            Command::Fullscreen { .. } => "Fullscreen",
            Command::FullscreenExit { .. } => "FullscreenExit",
            Command::PinToggle { .. } => "PinToggle",
            Command::SwitchDesktop { .. } => "SwitchDesktop",
            Command::MoveWindowToDesktop { .. } => "MoveWindowToDesktop",
            Command::MoveWindowToMonitor { .. } => "MoveWindowToMonitor",
        }
    }

    /// Target window id, for commands that have one.
    #[must_use]
    pub fn window_id(&self) -> Option<&str> {
        match self {
            Command::ActivateWindow { window_id }
            | Command::CloseWindow { window_id }
            | Command::Minimize { window_id }
            | Command::Maximize { window_id }
            | Command::Restore { window_id }
            | Command::Fullscreen { window_id }
            | Command::FullscreenExit { window_id }
            | Command::PinToggle { window_id }
            | Command::MoveWindowToDesktop { window_id, .. }
            | Command::MoveWindowToMonitor { window_id, .. } => Some(window_id),
            Command::SwitchDesktop { .. } => None,
        }
    }
}

/// Command outcome on the wire: `"ok"` or `"error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Ok,
    Error,
}

/// Acknowledgement payload: echo of the inbound command payload plus
/// the outcome. Every inbound command produces exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Echo of the inbound `payload` object, as received.
    pub command: Value,
    pub result: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CommandResult {
    #[must_use]
    pub fn ok(command: Value) -> Self {
        Self {
            command,
            result: CommandStatus::Ok,
            reason: None,
        }
    }

    #[must_use]
    pub fn failed(command: Value, reason: impl Into<String>) -> Self {
        Self {
            command,
            result: CommandStatus::Error,
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result == CommandStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> State {
        State {
            windows: vec![WindowRecord {
                id: "0x04200007".to_string(),
                title: "Konsole".to_string(),
                caption: Some("~ : bash".to_string()),
                pid: Some(4242),
                desktops: vec![1],
                on_all_desktops: false,
                monitor: Some("DP-2".to_string()),
                geometry: Some(Rect {
                    x: 10,
                    y: 20,
                    width: 800,
                    height: 600,
                }),
                minimized: false,
                maximized: true,
                fullscreen: false,
                active: true,
            }],
            desktops: vec![
                DesktopRecord {
                    index: 1,
                    name: "Main".to_string(),
                    current: true,
                },
                DesktopRecord {
                    index: 2,
                    name: "Work".to_string(),
                    current: false,
                },
            ],
            monitors: vec![MonitorRecord {
                index: 1,
                name: "DP-2".to_string(),
                geometry: Rect {
                    x: 0,
                    y: 0,
                    width: 2560,
                    height: 1440,
                },
                primary: true,
            }],
            timestamp: 1_700_000_000.25,
        }
    }

    #[test]
    fn test_command_parse_activate() {
        let json = r#"{"name":"ActivateWindow","windowId":"0x04200007"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::ActivateWindow {
                window_id: "0x04200007".to_string()
            }
        );
        assert_eq!(cmd.name(), "ActivateWindow");
        assert_eq!(cmd.window_id(), Some("0x04200007"));
    }

    #[test]
    fn test_command_parse_switch_desktop() {
        let json = r#"{"name":"SwitchDesktop","desktopIndex":3}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, Command::SwitchDesktop { desktop_index: 3 });
        assert!(cmd.window_id().is_none());
    }

    #[test]
    fn test_command_parse_switch_desktop_string_index() {
        let json = r#"{"name":"SwitchDesktop","desktopIndex":"3"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, Command::SwitchDesktop { desktop_index: 3 });
    }

    #[test]
    fn test_command_parse_legacy_close_event_alias() {
        let json = r#"{"name":"CloseEvent","windowId":"0xab"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::CloseWindow {
                window_id: "0xab".to_string()
            }
        );
    }

    #[test]
    fn test_command_parse_legacy_move_window_alias() {
        let json = r#"{"name":"MoveWindow","windowId":"0xab","targetDesktop":"2"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::MoveWindowToDesktop {
                window_id: "0xab".to_string(),
                desktop_index: 2,
            }
        );
    }

    #[test]
    fn test_command_parse_move_monitor_by_index() {
        let json = r#"{"name":"MoveWindowToMonitor","windowId":"0xab","monitorRef":2}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::MoveWindowToMonitor {
                window_id: "0xab".to_string(),
                monitor_ref: MonitorRef::Index(2),
            }
        );
    }

    #[test]
    fn test_command_parse_move_monitor_by_name() {
        let json = r#"{"name":"MoveWindowToMonitor","windowId":"0xab","monitorRef":"DP-2"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::MoveWindowToMonitor {
                window_id: "0xab".to_string(),
                monitor_ref: MonitorRef::Name("DP-2".to_string()),
            }
        );
    }

    #[test]
    fn test_command_unknown_name_rejected() {
        let json = r#"{"name":"Bogus","windowId":"0xab"}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_command_missing_required_field_rejected() {
        let json = r#"{"name":"ActivateWindow"}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_command_serialize_uses_wire_names() {
        let cmd = Command::MoveWindowToDesktop {
            window_id: "0xab".to_string(),
            desktop_index: 2,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"name\":\"MoveWindowToDesktop\""));
        assert!(json.contains("\"windowId\":\"0xab\""));
        assert!(json.contains("\"desktopIndex\":2"));
    }

    #[test]
    fn test_monitor_ref_display() {
        assert_eq!(MonitorRef::Index(2).to_string(), "2");
        assert_eq!(MonitorRef::Name("DP-2".to_string()).to_string(), "DP-2");
    }

    #[test]
    fn test_state_helpers() {
        let state = sample_state();
        assert_eq!(state.desktop_count(), 2);
        assert_eq!(state.current_desktop().unwrap().name, "Main");
        assert!(state.window("0x04200007").is_some());
        assert!(state.window("0xdead").is_none());
    }

    #[test]
    fn test_state_serialization_is_deterministic() {
        let state = sample_state();
        let a = serde_json::to_string(&state).unwrap();
        let b = serde_json::to_string(&state).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_state_roundtrip() {
        let state = sample_state();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: State = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_window_record_optional_fields_omitted() {
        let win = WindowRecord {
            id: "0x1".to_string(),
            title: "x".to_string(),
            caption: None,
            pid: None,
            desktops: vec![],
            on_all_desktops: true,
            monitor: None,
            geometry: None,
            minimized: false,
            maximized: false,
            fullscreen: false,
            active: false,
        };
        let json = serde_json::to_string(&win).unwrap();
        assert!(!json.contains("caption"));
        assert!(!json.contains("pid"));
        assert!(!json.contains("geometry"));
        assert!(json.contains("\"onAllDesktops\":true"));
    }

    #[test]
    fn test_command_result_ok() {
        let echo = serde_json::json!({"name": "ActivateWindow", "windowId": "0x1"});
        let result = CommandResult::ok(echo.clone());
        assert!(result.is_ok());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"result\":\"ok\""));
        assert!(!json.contains("reason"));
        assert_eq!(result.command, echo);
    }

    #[test]
    fn test_command_result_failed() {
        let result = CommandResult::failed(Value::Null, "invalid command");
        assert!(!result.is_ok());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"result\":\"error\""));
        assert!(json.contains("\"reason\":\"invalid command\""));
    }
}
