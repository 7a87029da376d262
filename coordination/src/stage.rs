//! Pipeline state machine: stages and legal transition guards.
//!
//! Every run starts at `Initialization` and walks the stages in a fixed
//! order. It terminates at `Complete`, or at `Failed` when a
//! stage-critical call errors or the run is cancelled.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Stages of a roundtable run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Initialization,
    Round1,
    Round2,
    Synthesis,
    Shots,
    Breakdown,
    /// Success. Terminal.
    Complete,
    /// Stage-critical failure or cancellation. Terminal.
    Failed,
}

impl RunStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// The stage that follows this one on the success path.
    pub fn next(self) -> Option<RunStage> {
        match self {
            Self::Initialization => Some(Self::Round1),
            Self::Round1 => Some(Self::Round2),
            Self::Round2 => Some(Self::Synthesis),
            Self::Synthesis => Some(Self::Shots),
            Self::Shots => Some(Self::Breakdown),
            Self::Breakdown => Some(Self::Complete),
            Self::Complete | Self::Failed => None,
        }
    }

    /// Label carried by the `status` event announcing this stage.
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::Round1 => "round1_start",
            Self::Round2 => "round2_start",
            Self::Synthesis => "synthesis_start",
            Self::Shots => "shots_start",
            Self::Breakdown => "breakdown_start",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Human-readable message for the `status` event.
    pub fn status_message(self) -> &'static str {
        match self {
            Self::Initialization => "Assembling the roundtable",
            Self::Round1 => "Round 1: the team weighs in",
            Self::Round2 => "Round 2: creative debate",
            Self::Synthesis => "Synthesizing the final prompt",
            Self::Shots => "Breaking the prompt into shots",
            Self::Breakdown => "Generating tags",
            Self::Complete => "Roundtable complete",
            Self::Failed => "Roundtable failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization => write!(f, "initialization"),
            Self::Round1 => write!(f, "round1"),
            Self::Round2 => write!(f, "round2"),
            Self::Synthesis => write!(f, "synthesis"),
            Self::Shots => write!(f, "shots"),
            Self::Breakdown => write!(f, "breakdown"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

fn is_legal_transition(from: RunStage, to: RunStage) -> bool {
    if to == RunStage::Failed && !from.is_terminal() {
        return true;
    }
    from.next() == Some(to)
}

/// A single recorded transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub from: RunStage,
    pub to: RunStage,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal stage transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: RunStage,
    pub to: RunStage,
}

/// Tracks the current stage of a run and logs every transition.
pub struct StageMachine {
    current: RunStage,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StageMachine {
    pub fn new() -> Self {
        Self {
            current: RunStage::Initialization,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> RunStage {
        self.current
    }

    /// Move to `to` if the stage graph allows it.
    pub fn advance(&mut self, to: RunStage, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, "Stage transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    /// Transition to `Failed`; legal from any non-terminal stage.
    pub fn fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(RunStage::Failed, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// Compact history, e.g. `initialization → round1 → round2`.
    pub fn summary(&self) -> String {
        std::iter::once(RunStage::Initialization)
            .chain(self.transitions.iter().map(|t| t.to))
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}
