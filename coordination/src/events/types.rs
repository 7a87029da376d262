//! Progress events emitted during a roundtable run.
//!
//! On the wire each event is `{ "type": ..., "data": {...}, "timestamp": ... }`
//! with camelCase keys inside `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roster::ParticipantId;

/// All progress events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RoundtableEvent {
    /// A stage or sub-stage boundary.
    Status { stage: String, message: String },

    /// A participant's Round 1 call is in flight.
    TypingStart { agent: ParticipantId, name: String },

    /// A participant's Round 1 call has settled.
    TypingStop { agent: ParticipantId, name: String },

    MessageChunk { agent: ParticipantId, content: String },

    #[serde(rename_all = "camelCase")]
    MessageComplete {
        agent: ParticipantId,
        name: String,
        emoji: String,
        conversational_response: String,
    },

    /// An isolated, participant-scoped failure.
    AgentError { agent: ParticipantId, error: String },

    #[serde(rename_all = "camelCase")]
    DebateStart {
        challenger: ParticipantId,
        challenger_name: String,
        challenger_emoji: String,
        responder: ParticipantId,
        responder_name: String,
        responder_emoji: String,
    },

    #[serde(rename_all = "camelCase")]
    DebateChunk {
        from: ParticipantId,
        from_name: String,
        content: String,
    },

    DebateMessage {
        from: ParticipantId,
        to: ParticipantId,
        content: String,
    },

    DebateComplete { message: String },

    SynthesisChunk { content: String },

    #[serde(rename_all = "camelCase")]
    SynthesisComplete {
        optimized_prompt: String,
        character_count: usize,
    },

    ShotsChunk { content: String },

    #[serde(rename_all = "camelCase")]
    ShotsComplete { suggested_shots: String },

    BreakdownStart { message: String },
}

impl RoundtableEvent {
    /// Wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::MessageChunk { .. } => "message_chunk",
            Self::MessageComplete { .. } => "message_complete",
            Self::AgentError { .. } => "agent_error",
            Self::DebateStart { .. } => "debate_start",
            Self::DebateChunk { .. } => "debate_chunk",
            Self::DebateMessage { .. } => "debate_message",
            Self::DebateComplete { .. } => "debate_complete",
            Self::SynthesisChunk { .. } => "synthesis_chunk",
            Self::SynthesisComplete { .. } => "synthesis_complete",
            Self::ShotsChunk { .. } => "shots_chunk",
            Self::ShotsComplete { .. } => "shots_complete",
            Self::BreakdownStart { .. } => "breakdown_start",
        }
    }

    /// Whether this is an incremental token/text chunk.
    pub fn is_chunk(&self) -> bool {
        matches!(
            self,
            Self::MessageChunk { .. }
                | Self::DebateChunk { .. }
                | Self::SynthesisChunk { .. }
                | Self::ShotsChunk { .. }
        )
    }

    /// The participant this event is attributed to, if any.
    pub fn agent(&self) -> Option<ParticipantId> {
        match self {
            Self::TypingStart { agent, .. }
            | Self::TypingStop { agent, .. }
            | Self::MessageChunk { agent, .. }
            | Self::MessageComplete { agent, .. }
            | Self::AgentError { agent, .. } => Some(*agent),
            Self::DebateChunk { from, .. } | Self::DebateMessage { from, .. } => Some(*from),
            _ => None,
        }
    }

    pub fn status(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// An event stamped by the bus that published it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub run_id: Uuid,
    /// Position within the run, starting at 0.
    pub sequence: u64,
    pub event: RoundtableEvent,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }

    /// `{ type, data, timestamp }` as sent to a live client.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(&self.event)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "timestamp".to_string(),
                serde_json::Value::String(self.timestamp.to_rfc3339()),
            );
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_matches_serde_tag() {
        let events = vec![
            RoundtableEvent::status("round1_start", "go"),
            RoundtableEvent::TypingStart {
                agent: ParticipantId::Director,
                name: "Director".into(),
            },
            RoundtableEvent::SynthesisComplete {
                optimized_prompt: "p".into(),
                character_count: 1,
            },
            RoundtableEvent::BreakdownStart {
                message: "tags".into(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
        }
    }

    #[test]
    fn test_data_keys_are_camel_case() {
        let event = RoundtableEvent::MessageComplete {
            agent: ParticipantId::Editor,
            name: "Editor".into(),
            emoji: "✂️".into(),
            conversational_response: "Cut on the wave.".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["agent"], "editor");
        assert_eq!(json["data"]["conversationalResponse"], "Cut on the wave.");

        let event = RoundtableEvent::DebateStart {
            challenger: ParticipantId::Director,
            challenger_name: "Director".into(),
            challenger_emoji: "🎬".into(),
            responder: ParticipantId::Cinematographer,
            responder_name: "Cinematographer".into(),
            responder_emoji: "🎥".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["challengerName"], "Director");
        assert_eq!(json["data"]["responderEmoji"], "🎥");
    }

    #[test]
    fn test_envelope_json_has_timestamp() {
        let envelope = EventEnvelope {
            run_id: Uuid::new_v4(),
            sequence: 0,
            event: RoundtableEvent::ShotsComplete {
                suggested_shots: "00:00-00:03 | Hook".into(),
            },
            timestamp: Utc::now(),
        };
        let json = envelope.to_json().unwrap();
        assert_eq!(json["type"], "shots_complete");
        assert_eq!(json["data"]["suggestedShots"], "00:00-00:03 | Hook");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_chunk_classification() {
        assert!(RoundtableEvent::SynthesisChunk {
            content: "x".into()
        }
        .is_chunk());
        assert!(!RoundtableEvent::status("complete", "done").is_chunk());
    }
}
