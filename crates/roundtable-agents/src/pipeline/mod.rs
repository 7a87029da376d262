//! Roundtable pipeline: drives one run through every stage.
//!
//! # Stage Flow
//!
//! ```text
//! Initialization → Round1 → Round2 → Synthesis → Shots → Breakdown → Complete
//!        │            │        │          │         │         │
//!        └────────────┴────────┴──────────┴─────────┴─────────┴──→ Failed
//! ```
//!
//! Round 1 and Round 2 failures are participant-scoped and never stop the
//! run. Synthesis and shot-list failures are stage-critical. Breakdown
//! failures are swallowed. Cancellation is checked at every transition
//! and raced against every in-flight call.

mod breakdown;
mod debate;
mod round1;
mod synthesis;

use std::future::Future;
use std::sync::Arc;

use coordination::debate::TransitionError;
use coordination::result::character_count;
use coordination::{
    assemble_context, DebatePlan, EventBus, EventEnvelope, IllegalTransition, RoundtableEvent,
    RoundtableInput, RunResult, RunStage, SharedEventBus, StageMachine, StreamAccumulator,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::completion::{CompletionClient, CompletionError, CompletionRequest, OpenAiProvider};
use crate::config::{RoundtableConfig, StageSettings};

/// Why a run ended without a result.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage-critical call failed.
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: RunStage,
        #[source]
        source: CompletionError,
    },

    #[error("Run cancelled during {stage}")]
    Cancelled { stage: RunStage },

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error(transparent)]
    Debate(#[from] TransitionError),
}

impl PipelineError {
    pub fn stage(&self) -> Option<RunStage> {
        match self {
            Self::StageFailed { stage, .. } | Self::Cancelled { stage } => Some(*stage),
            Self::IllegalTransition(e) => Some(e.from),
            Self::Debate(_) => Some(RunStage::Round2),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Handle to a run executing on its own task.
pub struct RunHandle {
    /// Lossless sink subscribed before the run published anything. Ends
    /// after the run's last event.
    pub events: mpsc::UnboundedReceiver<EventEnvelope>,
    pub bus: SharedEventBus,
    pub cancel: CancellationToken,
    pub task: JoinHandle<Result<RunResult, PipelineError>>,
}

/// The roundtable orchestrator. Holds no per-run state, so one instance
/// can serve any number of concurrent runs.
pub struct Roundtable {
    client: CompletionClient,
    stages: StageSettings,
    debate_plan: DebatePlan,
    event_capacity: usize,
}

impl Roundtable {
    pub fn new(client: CompletionClient, stages: StageSettings) -> Self {
        Self {
            client,
            stages,
            debate_plan: DebatePlan::default(),
            event_capacity: coordination::events::DEFAULT_CAPACITY,
        }
    }

    /// Build against the configured OpenAI-compatible endpoint.
    pub fn from_config(config: &RoundtableConfig) -> Result<Self, CompletionError> {
        let provider = OpenAiProvider::from_config(&config.endpoint)?;
        let client = CompletionClient::new(Arc::new(provider), config.retry.clone());
        Ok(Self::new(client, config.stages.clone()).with_event_capacity(config.event_capacity))
    }

    pub fn with_debate_plan(mut self, plan: DebatePlan) -> Self {
        self.debate_plan = plan;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Fresh bus sized for this orchestrator's runs.
    pub fn event_bus(&self) -> SharedEventBus {
        EventBus::with_capacity(self.event_capacity).shared()
    }

    /// Run to completion, publishing progress on `bus`.
    pub async fn run(
        &self,
        input: &RoundtableInput,
        bus: &EventBus,
    ) -> Result<RunResult, PipelineError> {
        self.run_with_cancel(input, bus, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancel(
        &self,
        input: &RoundtableInput,
        bus: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<RunResult, PipelineError> {
        let mut machine = StageMachine::new();
        let outcome = self.drive(&mut machine, input, bus, cancel).await;

        match outcome {
            Ok(mut result) => {
                info!(
                    run_id = %bus.run_id(),
                    path = %machine.summary(),
                    characters = result.character_count,
                    "Roundtable complete"
                );
                result.transitions = machine.into_transitions();
                Ok(result)
            }
            Err(e) => {
                if !machine.is_terminal() {
                    // fail() is legal from every non-terminal stage
                    let _ = machine.fail(&e.to_string());
                    bus.publish(RoundtableEvent::status(
                        RunStage::Failed.status_label(),
                        e.to_string(),
                    ));
                }
                warn!(
                    run_id = %bus.run_id(),
                    path = %machine.summary(),
                    error = %e,
                    "Roundtable failed"
                );
                Err(e)
            }
        }
    }

    /// Start a run on its own task with a fresh bus.
    pub fn spawn(self: Arc<Self>, input: RoundtableInput) -> RunHandle {
        let bus = self.event_bus();
        self.spawn_on(input, bus)
    }

    /// Start a run on a caller-provided bus. Other subscribers must join
    /// `bus` before calling this to see every event. The bus's lossless
    /// sinks are closed when the run ends.
    pub fn spawn_on(self: Arc<Self>, input: RoundtableInput, bus: SharedEventBus) -> RunHandle {
        let events = bus.subscribe_lossless();
        let cancel = CancellationToken::new();

        let task = {
            let bus = bus.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let outcome = self.run_with_cancel(&input, &bus, &cancel).await;
                bus.close_sinks();
                outcome
            })
        };

        RunHandle {
            events,
            bus,
            cancel,
            task,
        }
    }

    async fn drive(
        &self,
        machine: &mut StageMachine,
        input: &RoundtableInput,
        bus: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<RunResult, PipelineError> {
        bus.publish(RoundtableEvent::status(
            RunStage::Initialization.status_label(),
            RunStage::Initialization.status_message(),
        ));
        let context = assemble_context(input);
        info!(
            run_id = %bus.run_id(),
            platform = %input.platform,
            context_chars = context.len(),
            "Roundtable starting"
        );

        let ctx = StageContext {
            client: &self.client,
            stages: &self.stages,
            input,
            context: &context,
            bus,
            cancel,
        };

        ctx.enter(machine, RunStage::Round1)?;
        let responses = round1::run(&ctx).await?;

        ctx.enter(machine, RunStage::Round2)?;
        let exchanges = debate::run(&ctx, &self.debate_plan, &responses).await?;
        let turns: Vec<_> = exchanges.iter().flat_map(|e| e.turns.clone()).collect();

        ctx.enter(machine, RunStage::Synthesis)?;
        let final_prompt = synthesis::synthesize(&ctx, &responses, &turns).await?;

        ctx.enter(machine, RunStage::Shots)?;
        let suggested_shots = synthesis::shot_list(&ctx, &final_prompt).await?;

        ctx.enter(machine, RunStage::Breakdown)?;
        let hashtags = breakdown::hashtags(&ctx, &final_prompt).await?;

        ctx.enter(machine, RunStage::Complete)?;

        Ok(RunResult {
            character_count: character_count(&final_prompt),
            final_prompt,
            suggested_shots,
            agent_responses: responses,
            hashtags,
            transitions: Vec::new(),
        })
    }
}

/// How a streamed call ended, when it did not finish cleanly.
pub(crate) enum StreamFailure {
    Cancelled,
    Provider {
        /// Text received before the failure.
        partial: String,
        error: CompletionError,
    },
}

/// Borrowed per-run state handed to every stage executor.
pub(crate) struct StageContext<'a> {
    pub client: &'a CompletionClient,
    pub stages: &'a StageSettings,
    pub input: &'a RoundtableInput,
    pub context: &'a str,
    pub bus: &'a EventBus,
    pub cancel: &'a CancellationToken,
}

impl StageContext<'_> {
    /// Transition the run and announce the new stage.
    fn enter(&self, machine: &mut StageMachine, stage: RunStage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: machine.current(),
            });
        }
        machine.advance(stage, None)?;
        self.bus.publish(RoundtableEvent::status(
            stage.status_label(),
            stage.status_message(),
        ));
        Ok(())
    }

    /// Await `call` unless the run is cancelled first.
    pub(crate) async fn guard<F: Future>(
        &self,
        stage: RunStage,
        call: F,
    ) -> Result<F::Output, PipelineError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
            output = call => Ok(output),
        }
    }

    /// Stream `request`, publishing each fragment via `to_event`, and
    /// return the accumulated text.
    pub(crate) async fn stream_text<F>(
        &self,
        request: &CompletionRequest,
        to_event: F,
    ) -> Result<String, StreamFailure>
    where
        F: Fn(String) -> RoundtableEvent,
    {
        let bus = self.bus;
        let to_event = &to_event;

        let call = async {
            let stream = match self.client.stream(request).await {
                Ok(stream) => stream,
                Err(error) => {
                    return Err(StreamFailure::Provider {
                        partial: String::new(),
                        error,
                    })
                }
            };

            let (accumulator, failure) = stream
                .fold(
                    (StreamAccumulator::new(), None),
                    |(accumulator, failure), item| async move {
                        match (failure, item) {
                            (Some(error), _) => (accumulator, Some(error)),
                            (None, Ok(fragment)) => {
                                if !fragment.is_empty() {
                                    bus.publish(to_event(fragment.clone()));
                                }
                                (accumulator.fold(&fragment), None)
                            }
                            (None, Err(error)) => (accumulator, Some(error)),
                        }
                    },
                )
                .await;

            match failure {
                None => Ok(accumulator.finish()),
                Some(error) => Err(StreamFailure::Provider {
                    partial: accumulator.finish(),
                    error,
                }),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StreamFailure::Cancelled),
            outcome = call => outcome,
        }
    }

    /// Streamed call whose failure ends the run.
    pub(crate) async fn stream_critical<F>(
        &self,
        stage: RunStage,
        request: &CompletionRequest,
        to_event: F,
    ) -> Result<String, PipelineError>
    where
        F: Fn(String) -> RoundtableEvent,
    {
        match self.stream_text(request, to_event).await {
            Ok(text) => Ok(text),
            Err(StreamFailure::Cancelled) => Err(PipelineError::Cancelled { stage }),
            Err(StreamFailure::Provider { error, .. }) => {
                Err(PipelineError::StageFailed { stage, source: error })
            }
        }
    }
}
