//! STOP-TALK Response Validation
//!
//! Inspects a finished utterance for structural violations. Violations are
//! advisory: they are recorded as data on the [`ValidationResult`] and in the
//! session's diagnostics log, and never stop the utterance from being spoken.

use crate::{
    content::CANONICAL_TURN_SIGNALS,
    diagnostics::SessionDiagnostics,
    formatter::word_count,
    grade::{GradeBand, GradeLevel},
};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Words of headroom below the limit that still earn a `NearWordLimit` warning.
const NEAR_LIMIT_MARGIN: usize = 2;

/// A STOP-TALK rule an utterance broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum IssueKind {
    TooLong,
    MultipleQuestions,
    MissingTurnSignal,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::TooLong => "TooLong",
            IssueKind::MultipleQuestions => "MultipleQuestions",
            IssueKind::MissingTurnSignal => "MissingTurnSignal",
        };
        f.write_str(name)
    }
}

/// Advisories that are worth surfacing but do not count against compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum WarningKind {
    NearWordLimit,
    NoQuestion,
    EmptyResponse,
}

/// Whether an utterance is held to the STOP-TALK structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Standard,
    /// Scripted character dialogue. Logged, never checked.
    Exempt,
}

/// The outcome of validating a single utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub timestamp: DateTime<Utc>,
    pub response: String,
    pub grade_label: GradeBand,
    pub word_count: usize,
    pub issues: Vec<IssueKind>,
    pub warnings: Vec<WarningKind>,
    #[serde(default)]
    pub exempt: bool,
}

impl ValidationResult {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Evaluates every rule against `text`. Pure; rules never short-circuit
/// each other. Issues are reported in a fixed order.
pub fn check(text: &str, band: GradeBand) -> Vec<IssueKind> {
    let mut issues = Vec::new();
    if word_count(text.trim()) > band.validator_word_limit() {
        issues.push(IssueKind::TooLong);
    }
    if text.matches('?').count() > 1 {
        issues.push(IssueKind::MultipleQuestions);
    }
    if !has_turn_signal(text) {
        issues.push(IssueKind::MissingTurnSignal);
    }
    issues
}

/// True when any canonical turn-signal phrase appears, ignoring case.
pub fn has_turn_signal(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CANONICAL_TURN_SIGNALS
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

fn warnings_for(text: &str, words: usize, band: GradeBand) -> Vec<WarningKind> {
    let mut warnings = Vec::new();
    let limit = band.validator_word_limit();
    if words == 0 {
        warnings.push(WarningKind::EmptyResponse);
    } else if words <= limit && words + NEAR_LIMIT_MARGIN >= limit {
        warnings.push(WarningKind::NearWordLimit);
    }
    if words > 0 && !text.contains('?') {
        warnings.push(WarningKind::NoQuestion);
    }
    warnings
}

/// Checks utterances and records every result in the session's log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// Builds the result for `text` without recording it.
    pub fn evaluate(
        &self,
        text: &str,
        level: impl Into<GradeLevel>,
        mode: ValidationMode,
        timestamp: DateTime<Utc>,
    ) -> ValidationResult {
        let band = GradeBand::from_level(level);
        let words = word_count(text.trim());
        let (issues, warnings, exempt) = match mode {
            ValidationMode::Standard => (check(text, band), warnings_for(text, words, band), false),
            ValidationMode::Exempt => (Vec::new(), Vec::new(), true),
        };
        ValidationResult {
            timestamp,
            response: text.to_string(),
            grade_label: band,
            word_count: words,
            issues,
            warnings,
            exempt,
        }
    }

    /// Validates `text` and appends the result to `diagnostics`.
    ///
    /// This append is the only state the validator touches.
    pub fn validate(
        &self,
        text: &str,
        level: impl Into<GradeLevel>,
        mode: ValidationMode,
        diagnostics: &mut SessionDiagnostics,
    ) -> ValidationResult {
        let result = self.evaluate(text, level, mode, Utc::now());
        if result.is_clean() {
            debug!(
                grade = %result.grade_label,
                words = result.word_count,
                exempt = result.exempt,
                "Utterance passed STOP-TALK checks"
            );
        } else {
            warn!(
                grade = %result.grade_label,
                words = result.word_count,
                issues = ?result.issues,
                "STOP-TALK violation"
            );
        }
        diagnostics.record(result.clone());
        result
    }
}
