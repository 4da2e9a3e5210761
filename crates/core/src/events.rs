//! Signals delivered by the speech-recognition and playback collaborators.

use crate::error::EngineError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why speech recognition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Aborted,
    #[serde(other)]
    Other,
}

impl RecognitionErrorKind {
    /// Errors after which listening cannot resume without outside help.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            RecognitionErrorKind::AudioCapture | RecognitionErrorKind::NotAllowed
        )
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecognitionErrorKind::NoSpeech => "no-speech",
            RecognitionErrorKind::AudioCapture => "audio-capture",
            RecognitionErrorKind::NotAllowed => "not-allowed",
            RecognitionErrorKind::Network => "network",
            RecognitionErrorKind::Aborted => "aborted",
            RecognitionErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// An asynchronous signal from the speech layer, consumed one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// The learner finished a turn.
    TurnCompleted { transcript: String },
    /// The AI utterance finished playing; the floor passes to the learner.
    PlaybackFinished,
    /// The learner stayed quiet past the help timeout.
    LearnerSilent,
    RecognitionError { kind: RecognitionErrorKind },
    PlaybackError { kind: String },
}

impl SpeechEvent {
    /// Parses a JSON event payload.
    pub fn from_json(payload: &str) -> Result<Self, EngineError> {
        serde_json::from_str(payload).map_err(|e| EngineError::MalformedEvent(e.to_string()))
    }

    /// Converts an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(value).map_err(|e| EngineError::MalformedEvent(e.to_string()))
    }
}
