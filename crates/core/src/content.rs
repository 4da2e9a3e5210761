//! Static phrase tables consumed by the engine.
//!
//! These are plain lookup data. Nothing in the engine mutates them.

use crate::{grade::GradeBand, phase::PhaseState};

/// Phrases the validator accepts as an explicit invitation to speak.
///
/// Matched as case-insensitive substrings.
pub const CANONICAL_TURN_SIGNALS: &[&str] = &[
    "your turn",
    "go ahead",
    "now you try",
    "what would you say",
    "you try",
    "give it a try",
];

/// Candidate turn signals the formatter picks from when a draft has none.
///
/// Every candidate contains one of [`CANONICAL_TURN_SIGNALS`].
pub fn turn_signals(band: GradeBand) -> &'static [&'static str] {
    match band {
        GradeBand::KToTwo => &["Your turn!", "Now you try!", "Go ahead!"],
        GradeBand::ThreeToFive => &["Your turn!", "Now you try!", "Go ahead and try!"],
        GradeBand::SixToEight => &["Your turn.", "Go ahead.", "What would you say?"],
        GradeBand::NineToTwelve => &[
            "Your turn.",
            "What would you say?",
            "Go ahead, give it a try.",
        ],
    }
}

/// The scripted opening cue for each phase of the method.
pub fn phase_cue(phase: PhaseState) -> &'static str {
    match phase {
        PhaseState::Demonstrate => "Watch me: Hi, I'm Sam!",
        PhaseState::GuidedRepetition => "Say: Hi, I'm...",
        PhaseState::ScenarioPractice => "Pretend I'm new here.",
        PhaseState::Variation => "Now say it differently.",
    }
}

/// Feedback line opening each phase cue.
pub fn phase_feedback(phase: PhaseState) -> &'static str {
    match phase {
        PhaseState::Demonstrate => "",
        PhaseState::GuidedRepetition => "Nice!",
        PhaseState::ScenarioPractice => "Great!",
        PhaseState::Variation => "Awesome!",
    }
}

/// Praise spoken when character mode ends.
pub const CHARACTER_EXIT_PRAISE: &str = "Awesome!";

/// Reflection prompt following the praise.
pub const CHARACTER_EXIT_REFLECTION: &str = "Tell me about it.";

/// Short nudges used after a learner silence outlasts the help timeout.
pub const HELP_PROMPTS: &[&str] = &["Take your time.", "You can do it.", "Just one word."];

/// Used when speech recognition or playback fails and the learner must repeat.
pub const RETRY_PROMPT: &str = "Oops, I missed that.";

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_canonical(phrase: &str) -> bool {
        let lowered = phrase.to_lowercase();
        CANONICAL_TURN_SIGNALS.iter().any(|s| lowered.contains(s))
    }

    #[test]
    fn test_every_candidate_is_canonical() {
        for band in GradeBand::ALL {
            let candidates = turn_signals(band);
            assert!(!candidates.is_empty());
            for phrase in candidates {
                assert!(contains_canonical(phrase), "{phrase} is not canonical");
            }
        }
    }

    #[test]
    fn test_scripted_lines_fit_youngest_budget() {
        let k2 = GradeBand::KToTwo.profile().max_words;
        let longest_signal = turn_signals(GradeBand::KToTwo)
            .iter()
            .map(|s| s.split_whitespace().count())
            .max()
            .unwrap_or(0);
        for phase in PhaseState::ALL {
            let words = phase_feedback(phase).split_whitespace().count()
                + phase_cue(phase).split_whitespace().count();
            assert!(words + longest_signal <= k2, "{phase:?} cue overflows K-2");
        }
        let exit = CHARACTER_EXIT_PRAISE.split_whitespace().count()
            + CHARACTER_EXIT_REFLECTION.split_whitespace().count();
        assert!(exit + longest_signal <= k2);
    }

    #[test]
    fn test_candidates_fit_youngest_budget() {
        for phrase in turn_signals(GradeBand::KToTwo) {
            assert!(phrase.split_whitespace().count() <= 3);
        }
    }
}
