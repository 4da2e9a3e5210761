//! Response Formatting
//!
//! Assembles an AI utterance from its feedback, content and turn-signal
//! parts and clamps it to the grade band's word budget. Turn signals are
//! drawn through an injectable [`TurnSignalSelector`] so formatting is
//! reproducible under test.

use crate::{
    content,
    grade::{GradeBand, GradeLevel},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CLOSING_PUNCTUATION: [char; 6] = ['.', ',', ';', ':', '!', '?'];

/// Picks one of the candidate turn signals.
pub trait TurnSignalSelector: Send {
    /// Returns an index in `0..len`. Callers never pass `len == 0`.
    fn select(&mut self, len: usize) -> usize;
}

/// Uniform selection backed by a seedable `StdRng`.
pub struct SeededSelector {
    rng: StdRng,
}

impl SeededSelector {
    /// A selector that replays the same sequence for the same seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A selector seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl TurnSignalSelector for SeededSelector {
    fn select(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Always picks the same position (wrapped to the candidate count).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSelector(pub usize);

impl TurnSignalSelector for FixedSelector {
    fn select(&mut self, len: usize) -> usize {
        self.0 % len
    }
}

/// The parts of one AI turn, before formatting.
///
/// Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UtteranceDraft {
    pub feedback_text: String,
    pub content_text: String,
    /// Leave empty to let the formatter choose one for the grade band.
    pub turn_signal_text: String,
}

impl UtteranceDraft {
    pub fn new(feedback: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            feedback_text: feedback.into(),
            content_text: content.into(),
            turn_signal_text: String::new(),
        }
    }

    pub fn with_turn_signal(mut self, signal: impl Into<String>) -> Self {
        self.turn_signal_text = signal.into();
        self
    }
}

/// A finished utterance, ready for validation and speech synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormattedResponse {
    pub text: String,
    pub word_count: usize,
    pub grade_label: GradeBand,
    pub truncated: bool,
}

/// Counts whitespace-separated words. Empty or blank text has zero words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Shapes AI utterances for the STOP-TALK protocol.
pub struct ResponseFormatter {
    selector: Box<dyn TurnSignalSelector>,
}

impl ResponseFormatter {
    pub fn new(selector: Box<dyn TurnSignalSelector>) -> Self {
        Self { selector }
    }

    /// A formatter whose turn-signal choices are reproducible from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Box::new(SeededSelector::new(seed)))
    }

    /// Joins the draft's parts and truncates to the band's `max_words`.
    ///
    /// When the draft has no turn signal one is picked from the band's
    /// candidates, so the output is never empty. An over-long utterance is
    /// cut to exactly `max_words` words and closed with a single `!`.
    pub fn format(
        &mut self,
        draft: &UtteranceDraft,
        level: impl Into<GradeLevel>,
    ) -> FormattedResponse {
        let band = GradeBand::from_level(level);
        let max_words = band.profile().max_words;
        let signal = self.turn_signal_for(draft, band);

        let joined = [draft.feedback_text.as_str(), draft.content_text.as_str(), signal]
            .iter()
            .flat_map(|part| part.split_whitespace())
            .collect::<Vec<_>>();

        let (text, truncated) = if joined.len() > max_words {
            let mut words: Vec<String> =
                joined[..max_words].iter().map(|w| w.to_string()).collect();
            if let Some(last) = words.last_mut() {
                // A word that is only punctuation keeps its marks so it still counts.
                let stem = last.trim_end_matches(CLOSING_PUNCTUATION);
                let (stem_len, readable) = (stem.len(), stem.chars().any(char::is_alphanumeric));
                if readable {
                    last.truncate(stem_len);
                }
                last.push('!');
            }
            let text = words.join(" ");
            warn!(
                grade = %band,
                original_words = joined.len(),
                max_words,
                "Utterance over word budget, truncated"
            );
            (text, true)
        } else {
            (joined.join(" "), false)
        };

        let response = FormattedResponse {
            word_count: word_count(&text),
            text,
            grade_label: band,
            truncated,
        };
        debug!(
            grade = %band,
            words = response.word_count,
            text = %response.text,
            "Formatted utterance"
        );
        response
    }

    fn turn_signal_for<'a>(&mut self, draft: &'a UtteranceDraft, band: GradeBand) -> &'a str {
        let supplied = draft.turn_signal_text.trim();
        if !supplied.is_empty() {
            return supplied;
        }
        let candidates = content::turn_signals(band);
        candidates[self.selector.select(candidates.len()) % candidates.len()]
    }
}
