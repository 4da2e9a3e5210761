//! Session Diagnostics
//!
//! An append-only log of validation results owned by exactly one session,
//! plus the aggregate compliance statistics recomputed from it on demand.

use crate::{error::EngineError, validator::IssueKind, validator::ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// How many issue kinds the summary ranks.
const TOP_ISSUES: usize = 5;

/// Occurrences of one issue kind across the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCount {
    pub issue: IssueKind,
    pub count: usize,
}

/// Aggregate statistics over a session's validation log.
///
/// Rates and averages are rounded to one decimal place and serialize as
/// fixed-point strings (`"66.7"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDiagnosticsSummary {
    pub total_responses: usize,
    pub responses_with_issues: usize,
    pub exempt_responses: usize,
    #[serde(serialize_with = "one_decimal")]
    pub success_rate: f64,
    #[serde(serialize_with = "one_decimal")]
    pub avg_word_count: f64,
    pub top_issues: Vec<IssueCount>,
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.1}"))
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Computes the summary for `log`. Exempt results are counted separately
/// and left out of the compliance figures.
pub fn summarize(log: &[ValidationResult]) -> SessionDiagnosticsSummary {
    let checked: Vec<&ValidationResult> = log.iter().filter(|r| !r.exempt).collect();
    let total = checked.len();
    let with_issues = checked.iter().filter(|r| !r.is_clean()).count();

    let (success_rate, avg_word_count) = if total == 0 {
        (100.0, 0.0)
    } else {
        let words: usize = checked.iter().map(|r| r.word_count).sum();
        (
            round_one((total - with_issues) as f64 / total as f64 * 100.0),
            round_one(words as f64 / total as f64),
        )
    };

    // First-seen order is kept so the stable sort breaks ties by it.
    let mut top_issues: Vec<IssueCount> = Vec::new();
    for issue in checked.iter().flat_map(|r| r.issues.iter().copied()) {
        match top_issues.iter_mut().find(|c| c.issue == issue) {
            Some(entry) => entry.count += 1,
            None => top_issues.push(IssueCount { issue, count: 1 }),
        }
    }
    top_issues.sort_by(|a, b| b.count.cmp(&a.count));
    top_issues.truncate(TOP_ISSUES);

    SessionDiagnosticsSummary {
        total_responses: total,
        responses_with_issues: with_issues,
        exempt_responses: log.len() - total,
        success_rate,
        avg_word_count,
        top_issues,
    }
}

/// A faithful, order-preserving snapshot of the log for external storage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsExport {
    pub exported_at: DateTime<Utc>,
    pub summary: SessionDiagnosticsSummary,
    pub results: Vec<ValidationResult>,
}

/// The validation log for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionDiagnostics {
    results: Vec<ValidationResult>,
}

impl SessionDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result. Results are never edited or removed afterwards.
    pub fn record(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn summarize(&self) -> SessionDiagnosticsSummary {
        summarize(&self.results)
    }

    pub fn export(&self) -> DiagnosticsExport {
        DiagnosticsExport {
            exported_at: Utc::now(),
            summary: self.summarize(),
            results: self.results.clone(),
        }
    }

    /// Serializes [`Self::export`] as pretty JSON.
    pub fn export_log(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }
}
