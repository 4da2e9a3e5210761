//! Coaching Session
//!
//! Ties one grade profile, one formatter, one diagnostics log and one phase
//! orchestrator together for a single learner. Every entry point takes
//! `&mut self`, so at most one turn is ever being formatted and validated,
//! and speech events are applied strictly in the order they are handed in.
//! Dropping a session discards it whole; no turn is ever half-recorded.

use crate::{
    Command, EngineError, content,
    diagnostics::{DiagnosticsExport, SessionDiagnostics, SessionDiagnosticsSummary},
    events::{RecognitionErrorKind, SpeechEvent},
    formatter::{FormattedResponse, ResponseFormatter, UtteranceDraft},
    grade::{GradeBand, GradeLevel, GradeProfile},
    phase::{CharacterModeState, PhaseMethodOrchestrator, PhaseState, TurnKind},
    validator::{ResponseValidator, ValidationMode, ValidationResult},
};
use tracing::{debug, info, warn};

/// Consecutive playback failures tolerated before giving up.
pub const MAX_PLAYBACK_FAILURES: u32 = 3;

pub struct CoachingSession {
    band: GradeBand,
    formatter: ResponseFormatter,
    validator: ResponseValidator,
    diagnostics: SessionDiagnostics,
    orchestrator: PhaseMethodOrchestrator,
    /// Everything spoken in the latest batch, replayed whole on playback errors.
    last_spoken: Vec<(FormattedResponse, ValidationResult)>,
    last_transcript: Option<String>,
    playback_failures: u32,
    help_prompts_given: usize,
}

impl CoachingSession {
    /// Opens a session. The grade is resolved once here and stays fixed.
    pub fn new(
        level: impl Into<GradeLevel>,
        formatter: ResponseFormatter,
        max_exchanges: u32,
    ) -> Self {
        let band = GradeBand::from_level(level);
        info!(grade = %band, pace = band.profile().pace_label, "Coaching session opened");
        Self {
            band,
            formatter,
            validator: ResponseValidator::new(),
            diagnostics: SessionDiagnostics::new(),
            orchestrator: PhaseMethodOrchestrator::new(max_exchanges),
            last_spoken: Vec::new(),
            last_transcript: None,
            playback_failures: 0,
            help_prompts_given: 0,
        }
    }

    pub fn band(&self) -> GradeBand {
        self.band
    }

    pub fn profile(&self) -> &'static GradeProfile {
        self.band.profile()
    }

    pub fn phase(&self) -> PhaseState {
        self.orchestrator.phase()
    }

    pub fn character(&self) -> CharacterModeState {
        self.orchestrator.character()
    }

    pub fn diagnostics(&self) -> &SessionDiagnostics {
        &self.diagnostics
    }

    pub fn last_transcript(&self) -> Option<&str> {
        self.last_transcript.as_deref()
    }

    pub fn summary(&self) -> SessionDiagnosticsSummary {
        self.diagnostics.summarize()
    }

    pub fn export(&self) -> DiagnosticsExport {
        self.diagnostics.export()
    }

    pub fn export_log(&self) -> Result<String, EngineError> {
        self.diagnostics.export_log()
    }

    /// Speaks the scripted cue of the current phase.
    pub fn open(&mut self) -> Vec<Command> {
        let draft = self.orchestrator.opening_draft();
        self.respond(&draft, TurnKind::Coaching)
    }

    /// Formats, validates and schedules one AI turn.
    ///
    /// If the turn spends the last character-mode exchange, the exit
    /// utterance is scheduled right behind it.
    pub fn respond(&mut self, draft: &UtteranceDraft, kind: TurnKind) -> Vec<Command> {
        self.last_spoken.clear();
        self.take_turn(draft, kind)
    }

    /// Moves the method forward and speaks the new phase's cue.
    pub fn advance_phase(&mut self) -> Vec<Command> {
        let Some(transition) = self.orchestrator.advance() else {
            return Vec::new();
        };
        self.last_spoken.clear();
        let mut commands = Vec::new();
        if let Some(exit) = transition.exit {
            commands.push(self.speak(&exit, ValidationMode::Standard));
        }
        commands.push(Command::PhaseChanged {
            from: transition.from,
            to: transition.to,
        });
        let cue = self.orchestrator.opening_draft();
        commands.extend(self.take_turn(&cue, TurnKind::Coaching));
        commands
    }

    /// Applies one speech event.
    pub fn handle_event(&mut self, event: SpeechEvent) -> Result<Vec<Command>, EngineError> {
        debug!(?event, "Speech event");
        match event {
            SpeechEvent::TurnCompleted { transcript } => {
                let transcript = transcript.trim();
                if transcript.is_empty() {
                    return Err(EngineError::EmptyTranscript);
                }
                self.last_transcript = Some(transcript.to_string());
                self.help_prompts_given = 0;
                Ok(Vec::new())
            }
            SpeechEvent::PlaybackFinished => {
                self.playback_failures = 0;
                Ok(vec![Command::Listen {
                    help_timeout_ms: self.profile().help_timeout_ms,
                }])
            }
            SpeechEvent::LearnerSilent => Ok(self.help_prompt()),
            SpeechEvent::RecognitionError { kind } if kind.is_fatal() => {
                Err(EngineError::RecognitionUnavailable(kind.to_string()))
            }
            SpeechEvent::RecognitionError { kind } => {
                warn!(%kind, "Recognition error, asking the learner to repeat");
                if kind == RecognitionErrorKind::NoSpeech {
                    return Ok(self.help_prompt());
                }
                let draft = UtteranceDraft::new(content::RETRY_PROMPT, "");
                Ok(self.respond(&draft, TurnKind::Coaching))
            }
            SpeechEvent::PlaybackError { kind } => {
                self.playback_failures += 1;
                warn!(%kind, failures = self.playback_failures, "Playback error");
                if self.playback_failures >= MAX_PLAYBACK_FAILURES {
                    return Err(EngineError::PlaybackUnavailable(self.playback_failures));
                }
                Ok(self.replay())
            }
        }
    }

    fn take_turn(&mut self, draft: &UtteranceDraft, kind: TurnKind) -> Vec<Command> {
        let plan = self.orchestrator.take_ai_turn(kind);
        let mut commands = vec![self.speak(draft, plan.mode)];
        if let Some(exit) = plan.exit {
            commands.push(self.speak(&exit, ValidationMode::Standard));
        }
        commands
    }

    fn help_prompt(&mut self) -> Vec<Command> {
        let prompt = content::HELP_PROMPTS[self.help_prompts_given % content::HELP_PROMPTS.len()];
        self.help_prompts_given += 1;
        self.respond(&UtteranceDraft::new(prompt, ""), TurnKind::Coaching)
    }

    /// Re-issues the latest batch of utterances. They were already validated and logged.
    fn replay(&self) -> Vec<Command> {
        self.last_spoken
            .iter()
            .map(|(response, validation)| self.speak_command(response.clone(), validation.clone()))
            .collect()
    }

    fn speak(&mut self, draft: &UtteranceDraft, mode: ValidationMode) -> Command {
        let response = self.formatter.format(draft, self.band);
        let validation = self
            .validator
            .validate(&response.text, self.band, mode, &mut self.diagnostics);
        self.last_spoken.push((response.clone(), validation.clone()));
        self.speak_command(response, validation)
    }

    fn speak_command(&self, response: FormattedResponse, validation: ValidationResult) -> Command {
        let profile = self.profile();
        Command::Speak {
            response,
            validation,
            delay_ms: profile.post_response_delay_ms,
            speech_rate: profile.speech_rate,
        }
    }
}
