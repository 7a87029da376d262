//! Per-participant output and the terminal result of a run.

use serde::{Deserialize, Serialize};

use crate::roster::{Participant, ParticipantId};
use crate::stage::TransitionRecord;

/// Everything one participant contributed during Round 1.
///
/// A failed call leaves its text empty and records the error instead,
/// so synthesis always sees all five entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub agent: ParticipantId,
    pub name: String,
    pub emoji: String,
    pub conversational_response: String,
    pub technical_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversational_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_error: Option<String>,
}

impl ParticipantResponse {
    pub fn new(participant: &Participant) -> Self {
        Self {
            agent: participant.id,
            name: participant.name.to_string(),
            emoji: participant.emoji.to_string(),
            conversational_response: String::new(),
            technical_response: String::new(),
            conversational_error: None,
            technical_error: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.conversational_error.is_some() || self.technical_error.is_some()
    }
}

/// Final output of a completed roundtable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub final_prompt: String,
    pub character_count: usize,
    pub suggested_shots: String,
    pub agent_responses: Vec<ParticipantResponse>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Stage transition log, for diagnostics.
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

/// Character count reported alongside a final prompt.
pub fn character_count(text: &str) -> usize {
    text.chars().count()
}
