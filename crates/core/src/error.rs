use thiserror::Error;

/// Failures the engine reports upward. Malformed grade input and STOP-TALK
/// violations are never errors; these are the cases a caller must decide on.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed speech event: {0}")]
    MalformedEvent(String),
    #[error("Turn completed without a transcript")]
    EmptyTranscript,
    #[error("Speech recognition unavailable: {0}")]
    RecognitionUnavailable(String),
    #[error("Audio playback failed {0} times in a row")]
    PlaybackUnavailable(u32),
    #[error("Failed to serialize diagnostics: {0}")]
    Serialization(#[from] serde_json::Error),
}
