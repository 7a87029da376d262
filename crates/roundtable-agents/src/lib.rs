//! Roundtable runtime: completion client, pipeline executors and config.
//!
//! The domain layer (roster, prompts, events, state machines) lives in
//! the `coordination` crate; this crate adds everything that talks to a
//! model.

pub mod completion;
pub mod config;
pub mod pipeline;

pub use completion::{
    ChatMessage, Completion, CompletionClient, CompletionError, CompletionProvider,
    CompletionRequest, FragmentStream, OpenAiProvider, Role,
};
pub use config::{ConfigError, EndpointConfig, RoundtableConfig, StageParams, StageSettings};
pub use pipeline::{PipelineError, Roundtable, RunHandle};
