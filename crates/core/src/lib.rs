//! Conversation pacing and STOP-TALK response validation.
//!
//! The engine resolves a learner's grade into pacing constants, shapes and
//! checks every AI utterance before it is spoken, keeps a per-session
//! diagnostics log, and sequences the phases of the method. Response
//! content, speech recognition and audio playback live outside.

pub mod content;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod formatter;
pub mod grade;
pub mod phase;
pub mod session;
pub mod tools;
pub mod validator;

pub use error::EngineError;

use formatter::FormattedResponse;
use phase::PhaseState;
use serde::Serialize;
use validator::ValidationResult;

/// Commands the engine issues to the runtime that owns speech and display.
///
/// The engine decides; the runtime carries out the side effects.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Wait `delay_ms`, then speak the response at `speech_rate`.
    Speak {
        response: FormattedResponse,
        validation: ValidationResult,
        delay_ms: u64,
        speech_rate: f32,
    },
    /// Hand the floor to the learner; report silence after `help_timeout_ms`.
    Listen { help_timeout_ms: u64 },
    /// The method moved to a new phase.
    PhaseChanged { from: PhaseState, to: PhaseState },
}
