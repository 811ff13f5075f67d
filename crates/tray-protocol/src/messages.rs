use serde::{Deserialize, Serialize};

use crate::types::{NormalizedState, PollingStatus, WorkerStatus};

/// Machine-readable error code carried by `DaemonMessage::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigInvalid,
    DaemonAlreadyRunning,
    DaemonNotRunning,
    ConnectionFailed,
    ProtocolError,
    IoError,
    SerializationError,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// Convert a string error code (from `TrayError::error_code()`) to an `ErrorCode`.
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.to_string()))
            .unwrap_or(ErrorCode::Unknown)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ConfigInvalid => write!(f, "config_invalid"),
            ErrorCode::DaemonAlreadyRunning => write!(f, "daemon_already_running"),
            ErrorCode::DaemonNotRunning => write!(f, "daemon_not_running"),
            ErrorCode::ConnectionFailed => write!(f, "connection_failed"),
            ErrorCode::ProtocolError => write!(f, "protocol_error"),
            ErrorCode::IoError => write!(f, "io_error"),
            ErrorCode::SerializationError => write!(f, "serialization_error"),
            ErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client -> Daemon request messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// All requests carry an `id` field for response correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Latest published snapshot plus poller status.
    GetState { id: String },

    /// Ask the backend to stop handing jobs to its GPU worker.
    PauseWorker { id: String },

    ResumeWorker { id: String },

    /// Spawn the local worker inside the secondary execution context.
    StartWorker { id: String },

    StopWorker { id: String },

    /// Local worker running flag and captured output.
    WorkerOutput { id: String },

    /// Install a fresh API token and restart polling.
    SetToken { id: String, token: String },

    /// Exchange credentials for a token, optionally switching backends
    /// first, then restart polling with it.
    Login {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        server_url: Option<String>,
        username: String,
        password: String,
    },

    DaemonStop { id: String },

    Ping { id: String },
}

/// Daemon -> Client response messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// Responses echo the request `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonMessage {
    State {
        id: String,
        polling: PollingStatus,
        /// `None` until the first tick has been published.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<NormalizedState>,
    },

    ActionResult {
        id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    WorkerOutput { id: String, worker: WorkerStatus },

    Error {
        id: String,
        code: ErrorCode,
        message: String,
    },

    Ack { id: String },
}

impl ClientMessage {
    /// Extract the request ID from any client message.
    pub fn id(&self) -> &str {
        match self {
            ClientMessage::GetState { id }
            | ClientMessage::PauseWorker { id }
            | ClientMessage::ResumeWorker { id }
            | ClientMessage::StartWorker { id }
            | ClientMessage::StopWorker { id }
            | ClientMessage::WorkerOutput { id }
            | ClientMessage::SetToken { id, .. }
            | ClientMessage::Login { id, .. }
            | ClientMessage::DaemonStop { id }
            | ClientMessage::Ping { id } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionResult;

    #[test]
    fn test_client_message_tags() {
        let cases = [
            (
                ClientMessage::GetState {
                    id: "1".to_string(),
                },
                "get_state",
            ),
            (
                ClientMessage::PauseWorker {
                    id: "2".to_string(),
                },
                "pause_worker",
            ),
            (
                ClientMessage::StartWorker {
                    id: "3".to_string(),
                },
                "start_worker",
            ),
            (
                ClientMessage::DaemonStop {
                    id: "4".to_string(),
                },
                "daemon_stop",
            ),
        ];

        for (msg, tag) in cases {
            let json = serde_json::to_string(&msg).unwrap();
            assert!(
                json.contains(&format!(r#""type":"{}""#, tag)),
                "{} missing tag {}",
                json,
                tag
            );
        }
    }

    #[test]
    fn test_set_token_roundtrip_keeps_id() {
        let msg = ClientMessage::SetToken {
            id: "req-7".to_string(),
            token: "secret".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), "req-7");
        match parsed {
            ClientMessage::SetToken { token, .. } => assert_eq!(token, "secret"),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_login_server_url_is_optional_on_the_wire() {
        let json = r#"{"type":"login","id":"l1","username":"admin","password":"pw"}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::Login {
                id,
                server_url,
                username,
                ..
            } => {
                assert_eq!(id, "l1");
                assert_eq!(server_url, None);
                assert_eq!(username, "admin");
            }
            other => panic!("wrong variant: {:?}", other),
        }

        let msg = ClientMessage::Login {
            id: "l2".to_string(),
            server_url: None,
            username: "admin".to_string(),
            password: "pw".to_string(),
        };
        assert!(!serde_json::to_string(&msg).unwrap().contains("server_url"));
    }

    #[test]
    fn test_state_without_snapshot_omits_field() {
        let msg = DaemonMessage::State {
            id: "1".to_string(),
            polling: PollingStatus::Active,
            state: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"state","id":"1","polling":"active"}"#);
    }

    #[test]
    fn test_action_result_message_parses_from_wire() {
        let json = r#"{"type":"action_result","id":"9","ok":false,"error":"Worker is already running"}"#;
        let parsed: DaemonMessage = serde_json::from_str(json).unwrap();
        match parsed {
            DaemonMessage::ActionResult { id, ok, error } => {
                assert_eq!(id, "9");
                let result = ActionResult { ok, error };
                assert_eq!(result, ActionResult::failure("Worker is already running"));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_error_code_from_code() {
        assert_eq!(ErrorCode::from_code("protocol_error"), ErrorCode::ProtocolError);
        assert_eq!(
            ErrorCode::from_code("daemon_already_running"),
            ErrorCode::DaemonAlreadyRunning
        );
        assert_eq!(ErrorCode::from_code("no_such_code"), ErrorCode::Unknown);
    }

    #[test]
    fn test_error_code_display_matches_wire() {
        let json = serde_json::to_string(&ErrorCode::ConfigInvalid).unwrap();
        assert_eq!(json, format!(r#""{}""#, ErrorCode::ConfigInvalid));
    }
}
