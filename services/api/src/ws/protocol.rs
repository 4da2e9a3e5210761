//! Defines the WebSocket message protocol between the client runtime and the API server.

use serde::{Deserialize, Serialize};
use stoptalk_core::{
    Command, EngineError,
    diagnostics::{DiagnosticsExport, SessionDiagnosticsSummary},
    formatter::UtteranceDraft,
    grade::{GradeLevel, GradeProfile},
    phase::{PhaseState, TurnKind},
};
use uuid::Uuid;

/// Messages sent from the client to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts the session. This must be the first message.
    Init {
        /// The learner's grade, as a number or text. Falls back to the configured default.
        #[serde(default)]
        grade_level: GradeLevel,
    },
    /// An AI turn produced elsewhere, to be shaped and checked before speaking.
    Respond {
        draft: UtteranceDraft,
        #[serde(default)]
        kind: TurnKind,
    },
    /// A signal from the speech layer. Parsed separately so a bad payload
    /// is reported instead of dropped.
    Event { event: serde_json::Value },
    /// Move the lesson to its next phase.
    AdvancePhase,
    GetDiagnostics,
    ExportLog,
    /// Runs one of the session's pacing tools through its MCP service.
    ToolCall {
        name: String,
        #[serde(default)]
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    },
}

/// Messages sent from the server to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms initialization with the session's fixed pacing profile.
    Initialized {
        session_id: Uuid,
        profile: GradeProfile,
        phase: PhaseState,
    },
    /// Something the runtime must carry out (speak, listen, phase change).
    Command(Command),
    Diagnostics { summary: SessionDiagnosticsSummary },
    Export { export: DiagnosticsExport },
    /// The text a pacing tool returned.
    ToolResult { name: String, result: String },
    /// A failure. `fatal` marks ones after which the session cannot usefully go on.
    Error { message: String, fatal: bool },
}

impl ServerMessage {
    pub fn from_engine_error(err: &EngineError) -> Self {
        let fatal = matches!(
            err,
            EngineError::RecognitionUnavailable(_) | EngineError::PlaybackUnavailable(_)
        );
        ServerMessage::Error {
            message: err.to_string(),
            fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoptalk_core::grade::GradeBand;

    #[test]
    fn test_init_grade_is_optional() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        match msg {
            ClientMessage::Init { grade_level } => assert_eq!(grade_level, GradeLevel::Missing),
            other => panic!("unexpected {other:?}"),
        }
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"init","grade_level":2}"#).unwrap();
        match msg {
            ClientMessage::Init { grade_level } => {
                assert_eq!(GradeBand::from_level(grade_level), GradeBand::KToTwo)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_init_with_non_scalar_grade_still_parses() {
        for raw in [
            r#"{"type":"init","grade_level":true}"#,
            r#"{"type":"init","grade_level":[3]}"#,
            r#"{"type":"init","grade_level":{"g":3}}"#,
        ] {
            let msg: ClientMessage = serde_json::from_str(raw).unwrap();
            assert!(
                matches!(msg, ClientMessage::Init { grade_level: GradeLevel::Missing }),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_tool_call_arguments_are_optional() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"tool_call","name":"get_phase_status"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::ToolCall { arguments: None, .. }));

        let raw = r#"{"type":"tool_call","name":"check_response","arguments":{"text":"Hi!"}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::ToolCall { name, arguments } => {
                assert_eq!(name, "check_response");
                assert_eq!(arguments.unwrap()["text"], "Hi!");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_respond_defaults_to_coaching() {
        let raw = r#"{"type":"respond","draft":{"contentText":"Say hi."}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::Respond { draft, kind } => {
                assert_eq!(kind, TurnKind::Coaching);
                assert_eq!(draft.content_text, "Say hi.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_command_message_is_flattened() {
        let msg = ServerMessage::Command(Command::Listen { help_timeout_ms: 2000 });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "command");
        assert_eq!(json["command"], "listen");
        assert_eq!(json["help_timeout_ms"], 2000);
    }

    #[test]
    fn test_engine_error_fatality() {
        let fatal = ServerMessage::from_engine_error(&EngineError::PlaybackUnavailable(3));
        let recoverable = ServerMessage::from_engine_error(&EngineError::EmptyTranscript);
        assert!(matches!(fatal, ServerMessage::Error { fatal: true, .. }));
        assert!(matches!(recoverable, ServerMessage::Error { fatal: false, .. }));
    }
}
