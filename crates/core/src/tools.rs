//! Pacing Tool Service
//!
//! Exposes a live coaching session to the external response generator over
//! the Model Context Protocol (MCP). The generator can read the learner's
//! pacing profile, dry-run a candidate utterance against the STOP-TALK rules
//! before committing to it, and read the session's compliance figures.

use crate::{
    formatter::word_count,
    session::CoachingSession,
    validator::{ResponseValidator, ValidationMode},
};
use chrono::Utc;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Arguments for checking a candidate utterance.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct CheckResponseArgs {
    /// The exact text the AI intends to speak.
    #[schemars(description = "The exact utterance the AI intends to speak next")]
    pub text: String,
}

/// What a dry-run check reports back.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    word_count: usize,
    word_limit: usize,
    issues: Vec<String>,
    deliverable: bool,
}

/// MCP tools over one shared coaching session.
pub struct PacingService {
    /// The session this service reports on. Tools only read it.
    pub session: Arc<Mutex<CoachingSession>>,
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for PacingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Check every utterance with `check_response` before speaking. Keep one question per turn and end with a turn signal."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

#[tool_router]
impl PacingService {
    pub fn new(session: Arc<Mutex<CoachingSession>>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Get the learner's grade band and pacing profile: word limit, speech rate, and timing."
    )]
    pub async fn get_pacing_profile(&self) -> Result<String, String> {
        info!("Executing tool 'get_pacing_profile'");
        let session = self.session.lock().await;
        serde_json::to_string(session.profile())
            .map_err(|e| format!("Failed to serialize profile: {}", e))
    }

    /// Checks a candidate without recording it in the session log.
    #[tool(
        description = "Check a candidate utterance against the STOP-TALK rules (length, one question, turn signal) without speaking it."
    )]
    pub async fn check_response(
        &self,
        args: Parameters<CheckResponseArgs>,
    ) -> Result<String, String> {
        info!(args = ?args.0, "Executing tool 'check_response'");
        let band = self.session.lock().await.band();
        let result = ResponseValidator::new().evaluate(
            &args.0.text,
            band,
            ValidationMode::Standard,
            Utc::now(),
        );
        let report = CheckReport {
            word_count: word_count(&args.0.text),
            word_limit: band.validator_word_limit(),
            issues: result.issues.iter().map(ToString::to_string).collect(),
            deliverable: result.is_clean(),
        };
        serde_json::to_string(&report).map_err(|e| format!("Failed to serialize report: {}", e))
    }

    #[tool(description = "Get the current phase of the lesson and the character-mode status.")]
    pub async fn get_phase_status(&self) -> Result<String, String> {
        info!("Executing tool 'get_phase_status'");
        let session = self.session.lock().await;
        let status = serde_json::json!({
            "phase": session.phase(),
            "characterMode": session.character(),
        });
        Ok(status.to_string())
    }

    #[tool(description = "Get STOP-TALK compliance statistics for this session so far.")]
    pub async fn get_session_diagnostics(&self) -> Result<String, String> {
        info!("Executing tool 'get_session_diagnostics'");
        let session = self.session.lock().await;
        serde_json::to_string(&session.summary())
            .map_err(|e| format!("Failed to serialize diagnostics: {}", e))
    }
}
