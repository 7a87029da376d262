//! Roundtable Coordination Library
//!
//! The network-free half of the creative roundtable:
//! - The fixed participant roster and its prompt templates
//! - The shared context assembler
//! - The stage and debate state machines
//! - The per-run event bus and event schema
//! - Retry policy, stream accumulation and hashtag parsing
//!
//! Provider calls and stage execution live in `roundtable-agents`.

#![allow(clippy::uninlined_format_args)]

pub mod context;
pub mod debate;
pub mod events;
pub mod input;
pub mod prompts;
pub mod result;
pub mod retry;
pub mod roster;
pub mod stage;
pub mod stream;
pub mod tags;

pub use context::assemble_context;
pub use debate::{DebateExchange, DebatePairing, DebatePhase, DebatePlan, DebateTurn, TurnKind};
pub use events::{EventBus, EventEnvelope, EventFilter, RoundtableEvent, SharedEventBus};
pub use input::{PlatformSettings, RoundtableInput};
pub use prompts::PromptPair;
pub use result::{ParticipantResponse, RunResult};
pub use retry::RetryPolicy;
pub use roster::{roster, Participant, ParticipantId, ROSTER};
pub use stage::{IllegalTransition, RunStage, StageMachine, TransitionRecord};
pub use stream::StreamAccumulator;
pub use tags::parse_hashtags;
