//! Phase Method Orchestration
//!
//! Sequences the four pedagogical phases and owns the bounded character
//! mode that runs during scenario practice. Transitions only move forward
//! and are triggered from outside (turn completion signals); the
//! orchestrator never advances on its own except to leave character mode
//! once its exchange budget is spent.

use crate::{content, formatter::UtteranceDraft, validator::ValidationMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Exchanges allowed in character mode unless configured otherwise.
pub const DEFAULT_MAX_EXCHANGES: u32 = 5;

/// The phases of the method, in teaching order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PhaseState {
    Demonstrate,
    GuidedRepetition,
    ScenarioPractice,
    Variation,
}

impl PhaseState {
    pub const ALL: [PhaseState; 4] = [
        PhaseState::Demonstrate,
        PhaseState::GuidedRepetition,
        PhaseState::ScenarioPractice,
        PhaseState::Variation,
    ];

    /// The following phase, or `None` from the last one.
    pub fn next(self) -> Option<PhaseState> {
        match self {
            PhaseState::Demonstrate => Some(PhaseState::GuidedRepetition),
            PhaseState::GuidedRepetition => Some(PhaseState::ScenarioPractice),
            PhaseState::ScenarioPractice => Some(PhaseState::Variation),
            PhaseState::Variation => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CharacterModeState {
    pub active: bool,
    pub exchange_count: u32,
    pub max_exchanges: u32,
}

impl CharacterModeState {
    fn inactive(max_exchanges: u32) -> Self {
        Self {
            active: false,
            exchange_count: 0,
            max_exchanges,
        }
    }
}

/// Who is speaking in an AI turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    /// The coach talking to the learner.
    #[default]
    Coaching,
    /// A line of the scripted persona during scenario practice.
    Character,
}

/// How an AI turn must be handled, decided before it is formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnPlan {
    pub mode: ValidationMode,
    /// Set when this turn spent the last exchange; speak it right after.
    pub exit: Option<UtteranceDraft>,
}

/// A completed forward transition.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTransition {
    pub from: PhaseState,
    pub to: PhaseState,
    /// The character-mode exit forced by leaving scenario practice early.
    pub exit: Option<UtteranceDraft>,
}

/// Drives the Demonstrate → Guided Repetition → Scenario Practice →
/// Variation sequence.
#[derive(Debug, Clone)]
pub struct PhaseMethodOrchestrator {
    phase: PhaseState,
    character: CharacterModeState,
}

impl Default for PhaseMethodOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}

impl PhaseMethodOrchestrator {
    /// Starts in `Demonstrate`. A zero exchange budget is raised to one.
    pub fn new(max_exchanges: u32) -> Self {
        Self {
            phase: PhaseState::Demonstrate,
            character: CharacterModeState::inactive(max_exchanges.max(1)),
        }
    }

    pub fn phase(&self) -> PhaseState {
        self.phase
    }

    pub fn character(&self) -> CharacterModeState {
        self.character
    }

    /// The scripted opening for the current phase.
    pub fn opening_draft(&self) -> UtteranceDraft {
        UtteranceDraft::new(
            content::phase_feedback(self.phase),
            content::phase_cue(self.phase),
        )
    }

    /// Moves to the next phase. From `Variation` this is a no-op.
    pub fn advance(&mut self) -> Option<PhaseTransition> {
        let Some(to) = self.phase.next() else {
            warn!(phase = ?self.phase, "Already in the last phase, advance ignored");
            return None;
        };
        let from = self.phase;

        let exit = if self.character.active {
            warn!(
                exchanges = self.character.exchange_count,
                "Leaving scenario practice mid-character, forcing exit"
            );
            Some(self.exit_character_mode())
        } else {
            None
        };

        self.phase = to;
        if to == PhaseState::ScenarioPractice {
            self.character = CharacterModeState {
                active: true,
                exchange_count: 0,
                max_exchanges: self.character.max_exchanges,
            };
            info!(max_exchanges = self.character.max_exchanges, "Character mode started");
        }
        info!(?from, ?to, "Phase advanced");
        Some(PhaseTransition { from, to, exit })
    }

    /// Accounts for one AI turn of the given kind.
    ///
    /// While character mode is active every utterance is exempt from
    /// STOP-TALK checks. Character lines spend an exchange; the line that
    /// spends the last one carries the exit utterance in its plan.
    pub fn take_ai_turn(&mut self, kind: TurnKind) -> TurnPlan {
        if !self.character.active {
            if kind == TurnKind::Character {
                warn!(
                    phase = ?self.phase,
                    "Character line outside character mode, validating normally"
                );
            }
            return TurnPlan {
                mode: ValidationMode::Standard,
                exit: None,
            };
        }

        let exit = match kind {
            TurnKind::Character => {
                self.character.exchange_count += 1;
                if self.character.exchange_count >= self.character.max_exchanges {
                    Some(self.exit_character_mode())
                } else {
                    None
                }
            }
            TurnKind::Coaching => {
                warn!("Coaching utterance during character mode, left unvalidated");
                None
            }
        };
        TurnPlan {
            mode: ValidationMode::Exempt,
            exit,
        }
    }

    fn exit_character_mode(&mut self) -> UtteranceDraft {
        info!(
            exchanges = self.character.exchange_count,
            "Character mode finished"
        );
        self.character.active = false;
        UtteranceDraft::new(
            content::CHARACTER_EXIT_PRAISE,
            content::CHARACTER_EXIT_REFLECTION,
        )
    }
}
