//! Wire message envelopes.
//!
//! Every message on the wire is one JSON object per line with a `type`
//! tag and a `payload`:
//!
//! - client→server: `{"type":"command","payload":{"name":...,...}}`
//! - server→client: `{"type":"state","payload":{...}}` or
//!   `{"type":"ack","payload":{"command":{...},"result":"ok"|"error"}}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use winsync_types::{Command, CommandResult, State};

/// Failure reason reported for unparseable or unknown commands.
pub const INVALID_COMMAND: &str = "invalid command";

/// Messages pushed from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    State { payload: State },
    Ack { payload: CommandResult },
}

impl ServerMessage {
    #[must_use]
    pub fn state(payload: State) -> Self {
        ServerMessage::State { payload }
    }

    #[must_use]
    pub fn ack(payload: CommandResult) -> Self {
        ServerMessage::Ack { payload }
    }

    #[must_use]
    pub fn is_state(&self) -> bool {
        matches!(self, ServerMessage::State { .. })
    }

    #[must_use]
    pub fn is_ack(&self) -> bool {
        matches!(self, ServerMessage::Ack { .. })
    }
}

/// Messages sent from a client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Command { payload: Value },
}

impl ClientMessage {
    /// Wrap a command in its wire envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be serialized.
    pub fn command(command: &Command) -> Result<Self, serde_json::Error> {
        Ok(ClientMessage::Command {
            payload: serde_json::to_value(command)?,
        })
    }
}

/// Result of decoding one inbound line.
///
/// Malformed input is never connection-fatal; it decodes to `Invalid`
/// with a best-effort echo of whatever payload was present, so the
/// session can report it back in an error ack.
#[derive(Debug, Clone)]
pub enum Inbound {
    Command { command: Command, echo: Value },
    Invalid { echo: Value },
}

/// Decode one line from a client.
///
/// Accepts the tagged envelope, and a bare payload object carrying a
/// `name` field for compatibility with older clients.
#[must_use]
pub fn decode_line(line: &str) -> Inbound {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return Inbound::Invalid { echo: Value::Null };
    };

    let tagged = value.get("type").and_then(Value::as_str) == Some("command");
    let (echo, is_command) = if tagged {
        (value.get("payload").cloned().unwrap_or(Value::Null), true)
    } else if value.get("name").is_some() {
        (value.clone(), true)
    } else {
        (value.get("payload").cloned().unwrap_or(value), false)
    };

    if !is_command {
        return Inbound::Invalid { echo };
    }

    match serde_json::from_value::<Command>(echo.clone()) {
        Ok(command) => Inbound::Command { command, echo },
        Err(_) => Inbound::Invalid { echo },
    }
}
