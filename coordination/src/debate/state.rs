//! Debate exchange state machine: phases, transitions, and turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::DebatePairing;
use crate::roster::ParticipantId;

/// Phase of one challenge/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Exchange created but not started.
    Idle,
    /// Challenger is streaming a rebuttal.
    Challenge,
    /// Responder is streaming a reply.
    Response,
    /// Both turns recorded.
    Done,
    /// Abandoned before both turns finished.
    Aborted,
}

impl DebatePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Idle => &[Self::Challenge, Self::Aborted],
            Self::Challenge => &[Self::Response, Self::Aborted],
            Self::Response => &[Self::Done, Self::Aborted],
            Self::Done | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Challenge => write!(f, "challenge"),
            Self::Response => write!(f, "response"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Which half of the exchange a turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Challenge,
    Response,
}

/// One finished utterance in the debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateTurn {
    pub kind: TurnKind,
    pub from: ParticipantId,
    pub to: ParticipantId,
    /// Full accumulated text; may be partial or empty when `error` is set.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} → {to}: {reason}")]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

/// One challenger/responder exchange and its history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateExchange {
    pub pairing: DebatePairing,
    pub phase: DebatePhase,
    pub turns: Vec<DebateTurn>,
    pub transitions: Vec<DebateTransition>,
}

impl DebateExchange {
    pub fn new(pairing: DebatePairing) -> Self {
        Self {
            pairing,
            phase: DebatePhase::Idle,
            turns: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        Ok(())
    }

    /// Idle → Challenge.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(DebatePhase::Challenge, "debate started")
    }

    /// Who speaks next, to whom, and in which role.
    pub fn next_turn(&self) -> Option<(TurnKind, ParticipantId, ParticipantId)> {
        let DebatePairing {
            challenger,
            responder,
        } = self.pairing;
        match self.phase {
            DebatePhase::Challenge => Some((TurnKind::Challenge, challenger, responder)),
            DebatePhase::Response => Some((TurnKind::Response, responder, challenger)),
            _ => None,
        }
    }

    /// Record the finished turn for the current phase and advance.
    pub fn record_turn(
        &mut self,
        content: String,
        error: Option<String>,
    ) -> Result<&DebateTurn, TransitionError> {
        let Some((kind, from, to)) = self.next_turn() else {
            return Err(TransitionError {
                from: self.phase,
                to: self.phase,
                reason: "no turn expected in this phase".to_string(),
            });
        };

        let next = match kind {
            TurnKind::Challenge => DebatePhase::Response,
            TurnKind::Response => DebatePhase::Done,
        };
        let reason = if error.is_some() {
            format!("{} turn failed", from)
        } else {
            format!("{} finished", from)
        };
        self.transition(next, &reason)?;

        self.turns.push(DebateTurn {
            kind,
            from,
            to,
            content,
            error,
        });
        Ok(&self.turns[self.turns.len() - 1])
    }

    pub fn challenge(&self) -> Option<&DebateTurn> {
        self.turns.iter().find(|t| t.kind == TurnKind::Challenge)
    }

    pub fn response(&self) -> Option<&DebateTurn> {
        self.turns.iter().find(|t| t.kind == TurnKind::Response)
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }
}
