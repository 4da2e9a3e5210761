//! Axum Handlers for the REST API
//!
//! Stateless helpers around the engine: grade profile lookup and one-off
//! formatting and checking of utterances. Nothing here is logged to a
//! session; live sessions run over the WebSocket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use stoptalk_core::{
    diagnostics::SessionDiagnostics,
    grade::{self, GradeBand},
    validator::{ResponseValidator, ValidationMode},
};
use tracing::{debug, error};

use crate::{
    models::{
        BatchCheckBody, BatchCheckPayload, CheckResponseBody, CheckResponsePayload,
        ErrorResponse, FormatPayload, FormatResponseBody, GradeProfileResponse, HealthResponse,
    },
    state::AppState,
};

/// Longest utterance text the check endpoints accept, in bytes.
pub const MAX_TEXT_LEN: usize = 4096;

/// Longest batch the batch check endpoint accepts.
pub const MAX_BATCH_LEN: usize = 200;

pub enum ApiError {
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn ensure_text_len(text: &str) -> Result<(), ApiError> {
    if text.len() > MAX_TEXT_LEN {
        return Err(ApiError::BadRequest(format!(
            "text is {} bytes, limit is {}",
            text.len(),
            MAX_TEXT_LEN
        )));
    }
    Ok(())
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List the pacing profile of every grade band.
#[utoipa::path(
    get,
    path = "/grade-profiles",
    responses(
        (status = 200, description = "All grade band profiles, youngest first", body = [GradeProfileResponse])
    )
)]
pub async fn list_grade_profiles() -> Json<Vec<GradeProfileResponse>> {
    Json(
        GradeBand::ALL
            .iter()
            .map(|band| GradeProfileResponse::from(band.profile()))
            .collect(),
    )
}

/// Resolve a grade level to its pacing profile. Unreadable grades resolve to 6-8.
#[utoipa::path(
    get,
    path = "/grade-profiles/{grade}",
    responses(
        (status = 200, description = "The resolved profile", body = GradeProfileResponse)
    ),
    params(
        ("grade" = String, Path, description = "A grade number (\"1\", \"10\") or band label (\"3-5\")")
    )
)]
pub async fn get_grade_profile(Path(grade_level): Path<String>) -> Json<GradeProfileResponse> {
    let profile = grade::resolve(grade_level.as_str());
    debug!(input = %grade_level, band = %profile.grade_label, "Resolved grade profile");
    Json(GradeProfileResponse::from(profile))
}

/// Check an utterance against the STOP-TALK rules.
#[utoipa::path(
    post,
    path = "/responses/check",
    request_body = CheckResponsePayload,
    responses(
        (status = 200, description = "Issues and warnings found", body = CheckResponseBody),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn check_response(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckResponsePayload>,
) -> Result<Json<CheckResponseBody>, ApiError> {
    ensure_text_len(&payload.text)?;
    let band = GradeBand::from_level_or(payload.grade_level, state.config.default_grade);
    let result = ResponseValidator::new().evaluate(
        &payload.text,
        band,
        ValidationMode::Standard,
        Utc::now(),
    );
    Ok(Json(CheckResponseBody::from(&result)))
}

/// Format a draft for a grade band and check the result.
#[utoipa::path(
    post,
    path = "/responses/format",
    request_body = FormatPayload,
    responses(
        (status = 200, description = "The formatted utterance and its check", body = FormatResponseBody),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn format_response(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FormatPayload>,
) -> Result<Json<FormatResponseBody>, ApiError> {
    let draft = &payload.draft;
    ensure_text_len(&format!(
        "{}{}{}",
        draft.feedback_text, draft.content_text, draft.turn_signal_text
    ))?;
    let band = GradeBand::from_level_or(payload.grade_level, state.config.default_grade);
    let response = state.formatter().format(draft, band);
    let result = ResponseValidator::new().evaluate(
        &response.text,
        band,
        ValidationMode::Standard,
        Utc::now(),
    );
    Ok(Json(FormatResponseBody {
        check: CheckResponseBody::from(&result),
        response,
    }))
}

/// Check a transcript of utterances in order and summarize them like a session log.
#[utoipa::path(
    post,
    path = "/responses/batch-check",
    request_body = BatchCheckPayload,
    responses(
        (status = 200, description = "Per-utterance checks and the compliance summary", body = BatchCheckBody),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn batch_check(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchCheckPayload>,
) -> Result<Json<BatchCheckBody>, ApiError> {
    if payload.texts.len() > MAX_BATCH_LEN {
        return Err(ApiError::BadRequest(format!(
            "batch holds {} utterances, limit is {}",
            payload.texts.len(),
            MAX_BATCH_LEN
        )));
    }
    for text in &payload.texts {
        ensure_text_len(text)?;
    }

    let band = GradeBand::from_level_or(payload.grade_level, state.config.default_grade);
    let validator = ResponseValidator::new();
    let mut log = SessionDiagnostics::new();
    let checks = payload
        .texts
        .iter()
        .map(|text| {
            let result = validator.validate(text, band, ValidationMode::Standard, &mut log);
            CheckResponseBody::from(&result)
        })
        .collect();
    let export: serde_json::Value = serde_json::from_str(&log.export_log()?)?;

    Ok(Json(BatchCheckBody {
        checks,
        summary: log.summarize(),
        export,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use approx::assert_relative_eq;
    use stoptalk_core::grade::GradeLevel;
    use tracing::Level;

    fn state() -> Arc<AppState> {
        state_with_default(GradeBand::SixToEight)
    }

    fn state_with_default(default_grade: GradeBand) -> Arc<AppState> {
        Arc::new(AppState::new(Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            log_level: Level::INFO,
            default_grade,
            turn_signal_seed: Some(9),
            max_character_exchanges: 5,
        }))
    }

    #[tokio::test]
    async fn test_get_grade_profile_falls_back() {
        let Json(body) = get_grade_profile(Path("purple".to_string())).await;
        assert_eq!(body.grade_label, "6-8");
        let Json(body) = get_grade_profile(Path("1".to_string())).await;
        assert_eq!(body.max_words, 8);
    }

    #[tokio::test]
    async fn test_list_grade_profiles() {
        let Json(profiles) = list_grade_profiles().await;
        let labels: Vec<_> = profiles.iter().map(|p| p.grade_label.as_str()).collect();
        assert_eq!(labels, crate::models::band_labels());
    }

    #[tokio::test]
    async fn test_check_response_rejects_oversized_text() {
        let payload = CheckResponsePayload {
            text: "a".repeat(MAX_TEXT_LEN + 1),
            grade_level: GradeLevel::Missing,
        };
        let response = check_response(State(state()), Json(payload))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_grade_uses_configured_default() {
        let payload = CheckResponsePayload {
            text: "one two three four five six seven eight nine. Your turn!".to_string(),
            grade_level: GradeLevel::Missing,
        };
        let young = state_with_default(GradeBand::KToTwo);
        let Json(body) = check_response(State(young), Json(payload)).await.ok().unwrap();
        assert_eq!(body.grade_label, "K-2");
        assert_eq!(body.issues, vec!["TooLong"]);

        let payload: CheckResponsePayload =
            serde_json::from_str(r#"{"text":"Your turn!","gradeLevel":true}"#).unwrap();
        let older = state_with_default(GradeBand::NineToTwelve);
        let Json(body) = check_response(State(older), Json(payload)).await.ok().unwrap();
        assert_eq!(body.grade_label, "9-12");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_batch_check_summarizes_in_order() {
        let payload = BatchCheckPayload {
            texts: vec![
                "Nice! Your turn!".to_string(),
                "Good. Go ahead.".to_string(),
                "Great job! Now ask them their name and what they like to do. Your turn!"
                    .to_string(),
            ],
            grade_level: GradeLevel::from("1"),
        };
        let Json(body) = batch_check(State(state()), Json(payload)).await.ok().unwrap();

        assert_eq!(body.checks.len(), 3);
        assert_eq!(body.checks[2].issues, vec!["TooLong"]);
        assert_eq!(body.summary.total_responses, 3);
        assert_relative_eq!(body.summary.success_rate, 66.7);
        assert_eq!(body.export["summary"]["successRate"], "66.7");
        assert_eq!(body.export["results"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_batch_check_rejects_oversized_batch() {
        let payload = BatchCheckPayload {
            texts: vec!["Your turn!".to_string(); MAX_BATCH_LEN + 1],
            grade_level: GradeLevel::Missing,
        };
        let response = batch_check(State(state()), Json(payload))
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err: ApiError = anyhow::anyhow!("secret detail").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_format_response_respects_budget() {
        let payload = FormatPayload {
            draft: stoptalk_core::formatter::UtteranceDraft::new(
                "Great job!",
                "Now ask them their name and their age.",
            ),
            grade_level: GradeLevel::from("1"),
        };
        let Json(body) = format_response(State(state()), Json(payload)).await.ok().unwrap();
        assert!(body.response.truncated);
        assert_eq!(body.response.word_count, 8);
        assert_eq!(body.check.word_limit, 8);
    }
}
