//! API Models
//!
//! Request and response bodies for the REST surface. These mirror the
//! engine's types in a shape `utoipa` can document.

use serde::{Deserialize, Serialize};
use stoptalk_core::{
    diagnostics::SessionDiagnosticsSummary,
    formatter::{FormattedResponse, UtteranceDraft},
    grade::{GradeBand, GradeLevel, GradeProfile},
    validator::ValidationResult,
};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeProfileResponse {
    #[schema(example = "K-2")]
    pub grade_label: String,
    pub help_timeout_ms: u64,
    pub post_response_delay_ms: u64,
    pub max_words: usize,
    /// The limit the validator applies, tabulated apart from `max_words`.
    pub validator_word_limit: usize,
    #[schema(example = "slow")]
    pub response_speed_tier: String,
    #[schema(example = "high")]
    pub pause_tolerance: String,
    #[schema(example = 0.85)]
    pub speech_rate: f32,
    #[schema(example = "slow and gentle")]
    pub pace_label: String,
}

impl From<&GradeProfile> for GradeProfileResponse {
    fn from(profile: &GradeProfile) -> Self {
        Self {
            grade_label: profile.grade_label.label().to_string(),
            help_timeout_ms: profile.help_timeout_ms,
            post_response_delay_ms: profile.post_response_delay_ms,
            max_words: profile.max_words,
            validator_word_limit: profile.grade_label.validator_word_limit(),
            response_speed_tier: format!("{:?}", profile.response_speed_tier).to_lowercase(),
            pause_tolerance: format!("{:?}", profile.pause_tolerance).to_lowercase(),
            speech_rate: profile.speech_rate,
            pace_label: profile.pace_label.to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponsePayload {
    #[schema(example = "Great job! Now ask their name. Your turn!")]
    pub text: String,
    /// A grade number or label. Anything unreadable is treated as 6-8.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "3")]
    pub grade_level: GradeLevel,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponseBody {
    #[schema(example = "3-5")]
    pub grade_label: String,
    pub word_count: usize,
    pub word_limit: usize,
    #[schema(example = json!(["MultipleQuestions"]))]
    pub issues: Vec<String>,
    #[schema(example = json!(["NoQuestion"]))]
    pub warnings: Vec<String>,
}

impl From<&ValidationResult> for CheckResponseBody {
    fn from(result: &ValidationResult) -> Self {
        Self {
            grade_label: result.grade_label.label().to_string(),
            word_count: result.word_count,
            word_limit: result.grade_label.validator_word_limit(),
            issues: result.issues.iter().map(ToString::to_string).collect(),
            warnings: result.warnings.iter().map(|w| format!("{:?}", w)).collect(),
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FormatPayload {
    #[schema(value_type = Object)]
    pub draft: UtteranceDraft,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "1")]
    pub grade_level: GradeLevel,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FormatResponseBody {
    #[schema(value_type = Object)]
    pub response: FormattedResponse,
    pub check: CheckResponseBody,
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckPayload {
    /// Utterances in the order they were spoken.
    pub texts: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "7")]
    pub grade_level: GradeLevel,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckBody {
    pub checks: Vec<CheckResponseBody>,
    #[schema(value_type = Object)]
    pub summary: SessionDiagnosticsSummary,
    /// The full log as `exportLog` writes it.
    #[schema(value_type = Object)]
    pub export: serde_json::Value,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}

/// Band labels accepted in paths, youngest first.
pub fn band_labels() -> Vec<&'static str> {
    GradeBand::ALL.iter().map(|b| b.label()).collect()
}
