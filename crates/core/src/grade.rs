//! Grade Profile Resolution
//!
//! Maps a learner's grade level onto one of four fixed grade bands and the
//! pacing constants attached to it. Grade input arrives loosely typed (a
//! number, some text, or nothing at all) and is normalized into a
//! [`GradeBand`] here; nothing past this module sees the raw value.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The band used whenever a grade level cannot be interpreted.
pub const DEFAULT_BAND: GradeBand = GradeBand::SixToEight;

/// A grade level as supplied by callers, before normalization.
///
/// Deserializes from a JSON number or string. Every other JSON value,
/// `null` included, becomes [`GradeLevel::Missing`] rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, Default)]
#[serde(untagged)]
pub enum GradeLevel {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl<'de> Deserialize<'de> for GradeLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde_json::Value;

        let level = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64().map_or(GradeLevel::Missing, GradeLevel::Number),
            Value::String(text) => GradeLevel::Text(text),
            Value::Null => GradeLevel::Missing,
            other => {
                tracing::debug!(value = %other, "Grade level is not a number or text");
                GradeLevel::Missing
            }
        };
        Ok(level)
    }
}

impl From<i64> for GradeLevel {
    fn from(value: i64) -> Self {
        GradeLevel::Number(value as f64)
    }
}

impl From<u8> for GradeLevel {
    fn from(value: u8) -> Self {
        GradeLevel::Number(f64::from(value))
    }
}

impl From<&str> for GradeLevel {
    fn from(value: &str) -> Self {
        GradeLevel::Text(value.to_string())
    }
}

impl From<String> for GradeLevel {
    fn from(value: String) -> Self {
        GradeLevel::Text(value)
    }
}

impl From<GradeBand> for GradeLevel {
    fn from(band: GradeBand) -> Self {
        GradeLevel::Text(band.label().to_string())
    }
}

impl<T: Into<GradeLevel>> From<Option<T>> for GradeLevel {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(GradeLevel::Missing)
    }
}

impl GradeLevel {
    /// Interprets the level as an integer grade, if possible.
    ///
    /// Text is read by its leading integer, so "3rd", " 5 " and "9-12" all
    /// yield a grade. "K" and "kindergarten" are grade 0.
    pub fn as_grade(&self) -> Option<i64> {
        match self {
            GradeLevel::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            GradeLevel::Number(_) => None,
            GradeLevel::Text(text) => parse_leading_integer(text),
            GradeLevel::Missing => None,
        }
    }
}

fn parse_leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered == "k" || lowered.starts_with("k-") || lowered.starts_with("kinder") {
        return Some(0);
    }

    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Digit runs too long for i64 are still a (very high) grade.
    let grade = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * grade)
}

/// One of the four fixed grade groupings that drive pacing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum GradeBand {
    #[serde(rename = "K-2")]
    KToTwo,
    #[serde(rename = "3-5")]
    ThreeToFive,
    #[serde(rename = "6-8")]
    SixToEight,
    #[serde(rename = "9-12")]
    NineToTwelve,
}

impl GradeBand {
    /// All bands, youngest first.
    pub const ALL: [GradeBand; 4] = [
        GradeBand::KToTwo,
        GradeBand::ThreeToFive,
        GradeBand::SixToEight,
        GradeBand::NineToTwelve,
    ];

    /// Selects the band for an integer grade.
    pub fn from_grade(grade: i64) -> Self {
        match grade {
            g if g <= 2 => GradeBand::KToTwo,
            g if g <= 5 => GradeBand::ThreeToFive,
            g if g <= 8 => GradeBand::SixToEight,
            _ => GradeBand::NineToTwelve,
        }
    }

    /// Normalizes any grade input. Never fails: anything unreadable lands
    /// in [`DEFAULT_BAND`].
    pub fn from_level(level: impl Into<GradeLevel>) -> Self {
        Self::from_level_or(level, DEFAULT_BAND)
    }

    /// Like [`Self::from_level`], with a caller-chosen fallback band.
    pub fn from_level_or(level: impl Into<GradeLevel>, default: GradeBand) -> Self {
        let level = level.into();
        match level.as_grade() {
            Some(grade) => Self::from_grade(grade),
            None => {
                tracing::debug!(?level, %default, "Unreadable grade level, using default band");
                default
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GradeBand::KToTwo => "K-2",
            GradeBand::ThreeToFive => "3-5",
            GradeBand::SixToEight => "6-8",
            GradeBand::NineToTwelve => "9-12",
        }
    }

    /// The pacing profile for this band.
    pub fn profile(self) -> &'static GradeProfile {
        match self {
            GradeBand::KToTwo => &PROFILES[0],
            GradeBand::ThreeToFive => &PROFILES[1],
            GradeBand::SixToEight => &PROFILES[2],
            GradeBand::NineToTwelve => &PROFILES[3],
        }
    }

    /// Word limit applied by the response validator.
    ///
    /// Tabulated separately from [`GradeProfile::max_words`]; the two
    /// tables disagree for 3-5 (validator 12, profile 10).
    pub fn validator_word_limit(self) -> usize {
        match self {
            GradeBand::KToTwo => 8,
            GradeBand::ThreeToFive => 12,
            GradeBand::SixToEight => 15,
            GradeBand::NineToTwelve => 20,
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How quickly the AI is expected to come back after the learner finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSpeedTier {
    Slow,
    Moderate,
    Normal,
    Quick,
}

/// How much learner silence is tolerated before a help prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PauseTolerance {
    High,
    Medium,
    Low,
}

/// Fixed timing and length constants for one grade band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeProfile {
    pub grade_label: GradeBand,
    pub help_timeout_ms: u64,
    pub post_response_delay_ms: u64,
    pub max_words: usize,
    pub response_speed_tier: ResponseSpeedTier,
    pub pause_tolerance: PauseTolerance,
    /// Playback-rate multiplier for speech synthesis.
    pub speech_rate: f32,
    pub pace_label: &'static str,
}

static PROFILES: [GradeProfile; 4] = [
    GradeProfile {
        grade_label: GradeBand::KToTwo,
        help_timeout_ms: 2000,
        post_response_delay_ms: 1500,
        max_words: 8,
        response_speed_tier: ResponseSpeedTier::Slow,
        pause_tolerance: PauseTolerance::High,
        speech_rate: 0.85,
        pace_label: "slow and gentle",
    },
    GradeProfile {
        grade_label: GradeBand::ThreeToFive,
        help_timeout_ms: 2500,
        post_response_delay_ms: 1200,
        max_words: 10,
        response_speed_tier: ResponseSpeedTier::Moderate,
        pause_tolerance: PauseTolerance::High,
        speech_rate: 0.90,
        pace_label: "steady",
    },
    GradeProfile {
        grade_label: GradeBand::SixToEight,
        help_timeout_ms: 2500,
        post_response_delay_ms: 1000,
        max_words: 15,
        response_speed_tier: ResponseSpeedTier::Normal,
        pause_tolerance: PauseTolerance::Medium,
        speech_rate: 0.95,
        pace_label: "conversational",
    },
    GradeProfile {
        grade_label: GradeBand::NineToTwelve,
        help_timeout_ms: 3000,
        post_response_delay_ms: 800,
        max_words: 20,
        response_speed_tier: ResponseSpeedTier::Quick,
        pause_tolerance: PauseTolerance::Low,
        speech_rate: 1.00,
        pace_label: "natural",
    },
];

/// Resolves any grade input to its pacing profile.
pub fn resolve(level: impl Into<GradeLevel>) -> &'static GradeProfile {
    GradeBand::from_level(level).profile()
}
