//! Manages the WebSocket connection lifecycle for a coaching session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::{Context, Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, RawContent},
    service::{RoleClient, RunningService},
};
use std::sync::Arc;
use stoptalk_core::{
    Command,
    events::SpeechEvent,
    grade::{GradeBand, GradeLevel},
    session::CoachingSession,
    tools::PacingService,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{Instrument, error, info, instrument, warn};
use uuid::Uuid;

type ToolClient = RunningService<RoleClient, ()>;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Waits for the `init` message, opens the coaching session, and then runs
/// the session loop until the client goes away. A grade that cannot be read
/// never fails the handshake; only a missing or unparseable `init` does.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", session_id.to_string());
    info!("New WebSocket connection. Awaiting initialization...");

    let (mut socket_tx, mut socket_rx) = socket.split();

    // The first message from the client must be an `init` message.
    let grade_level = match socket_rx.next().await {
        Some(Ok(Message::Text(text))) => parse_init(text.as_str()),
        Some(Ok(_)) => Err(anyhow!("First message was not a text `init` message.")),
        _ => {
            info!("Client disconnected before sending init message.");
            return;
        }
    };
    let grade_level = match grade_level {
        Ok(level) => level,
        Err(e) => {
            error!("Session initialization failed: {:?}", e);
            let _ = send_msg(
                &mut socket_tx,
                ServerMessage::Error {
                    message: e.to_string(),
                    fatal: true,
                },
            )
            .await;
            return;
        }
    };

    let mut session = open_session(&state, grade_level);
    let band = session.band();
    let mut opening = vec![ServerMessage::Initialized {
        session_id,
        profile: session.profile().clone(),
        phase: session.phase(),
    }];
    opening.extend(commands(session.open()));
    for msg in opening {
        if send_msg(&mut socket_tx, msg).await.is_err() {
            error!("Failed to send opening messages to client.");
            return;
        }
    }

    let session_span = tracing::info_span!("coaching_session", %session_id, grade = %band);
    let session = Arc::new(Mutex::new(session));
    async move {
        if let Err(e) = run_coaching_session(session, socket_tx, socket_rx).await {
            error!(error = ?e, "Coaching session terminated with error.");
        }
        info!("Coaching session finished.");
    }
    .instrument(session_span)
    .await;
}

fn parse_init(init_text: &str) -> Result<GradeLevel> {
    let init_msg: ClientMessage =
        serde_json::from_str(init_text).context("Could not parse `init` message")?;
    match init_msg {
        ClientMessage::Init { grade_level } => Ok(grade_level),
        _ => Err(anyhow!("First message must be `init`")),
    }
}

/// Builds the session, substituting the configured default for a missing
/// or unreadable grade.
fn open_session(state: &AppState, grade_level: GradeLevel) -> CoachingSession {
    let band = GradeBand::from_level_or(grade_level, state.config.default_grade);
    CoachingSession::new(
        band,
        state.formatter(),
        state.config.max_character_exchanges,
    )
}

/// Serves the session's pacing tools over an in-process MCP transport and
/// returns the client end.
async fn start_tool_service(
    session: Arc<Mutex<CoachingSession>>,
) -> Result<(ToolClient, JoinHandle<()>)> {
    let pacing_service = PacingService::new(session);
    let (server_transport, client_transport) = tokio::io::duplex(4096);

    let tool_handle = tokio::spawn(async move {
        if let Ok(service) = pacing_service.serve(server_transport).await {
            let _ = service.waiting().await;
        }
    });
    let tool_client = ()
        .serve(client_transport)
        .await
        .context("Could not connect to the pacing tool service")?;
    Ok((tool_client, tool_handle))
}

/// The main loop for an active session.
///
/// Messages are handled one at a time, in arrival order, and each is fully
/// processed before the next is read. When the loop ends the session is
/// dropped along with its log.
async fn run_coaching_session(
    session: Arc<Mutex<CoachingSession>>,
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
) -> Result<()> {
    let (tool_client, tool_handle) = start_tool_service(session.clone()).await?;

    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let replies = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::ToolCall { name, arguments }) => {
                        vec![call_tool(&tool_client, name, arguments).await]
                    }
                    Ok(msg) => {
                        let mut session = session.lock().await;
                        handle_client_message(&mut session, msg)
                    }
                    Err(e) => {
                        warn!(error = %e, "Unparseable client message.");
                        vec![ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                            fatal: false,
                        }]
                    }
                };
                for reply in replies {
                    send_msg(&mut socket_tx, reply).await?;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame; audio is handled by the client runtime.");
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        }
    }

    tool_handle.abort();
    let summary = session.lock().await.summary();
    info!(
        total = summary.total_responses,
        with_issues = summary.responses_with_issues,
        success_rate = summary.success_rate,
        "WebSocket connection closed and coaching session torn down."
    );
    Ok(())
}

fn commands(commands: Vec<Command>) -> Vec<ServerMessage> {
    commands.into_iter().map(ServerMessage::Command).collect()
}

/// Applies one client message to the session and returns the replies.
pub(crate) fn handle_client_message(
    session: &mut CoachingSession,
    msg: ClientMessage,
) -> Vec<ServerMessage> {
    match msg {
        ClientMessage::Init { .. } => vec![ServerMessage::Error {
            message: "Session is already initialized.".to_string(),
            fatal: false,
        }],
        ClientMessage::Respond { draft, kind } => commands(session.respond(&draft, kind)),
        ClientMessage::Event { event } => {
            match SpeechEvent::from_value(event).and_then(|event| session.handle_event(event)) {
                Ok(cmds) => commands(cmds),
                Err(e) => {
                    warn!(error = %e, "Speech event failed.");
                    vec![ServerMessage::from_engine_error(&e)]
                }
            }
        }
        ClientMessage::AdvancePhase => commands(session.advance_phase()),
        ClientMessage::GetDiagnostics => vec![ServerMessage::Diagnostics {
            summary: session.summary(),
        }],
        ClientMessage::ExportLog => vec![ServerMessage::Export {
            export: session.export(),
        }],
        ClientMessage::ToolCall { name, .. } => vec![ServerMessage::Error {
            message: format!("Tool `{}` is only reachable through the tool service.", name),
            fatal: false,
        }],
    }
}

/// Runs a pacing tool and wraps its text, or the failure, for the client.
async fn call_tool(
    tool_client: &ToolClient,
    name: String,
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> ServerMessage {
    match run_tool(tool_client, &name, arguments).await {
        Ok(result) => ServerMessage::ToolResult { name, result },
        Err(e) => {
            warn!(tool = %name, error = ?e, "Tool call failed.");
            ServerMessage::Error {
                message: format!("Tool `{}` failed: {}", name, e),
                fatal: false,
            }
        }
    }
}

async fn run_tool(
    tool_client: &ToolClient,
    name: &str,
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<String> {
    info!(tool = %name, "Forwarding tool call to the pacing service.");
    let result = tool_client
        .peer()
        .call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments,
        })
        .await?;

    let failed = result.is_error.unwrap_or(false);
    let annotated_content = result
        .content
        .context("Tool call returned no content")?
        .pop()
        .context("Content list was empty")?;
    let text = match annotated_content.raw {
        RawContent::Text(text_content) => text_content.text,
        _ => return Err(anyhow!("Unexpected content type from tool")),
    };
    if failed {
        return Err(anyhow!(text));
    }
    Ok(text)
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
