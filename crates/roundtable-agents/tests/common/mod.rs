//! Scripted completion provider shared by the integration tests.
//!
//! Every call is classified from its prompt text. A call answers with the
//! next queued reply for its kind, or a deterministic default.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use coordination::events::drain;
use coordination::prompts::SYNTHESIS_SECTIONS;
use coordination::{
    EventBus, EventEnvelope, ParticipantId, RetryPolicy, RoundtableEvent, RoundtableInput,
    RunResult, ROSTER,
};
use futures::StreamExt;
use roundtable_agents::{
    CompletionClient, CompletionError, CompletionProvider, CompletionRequest, FragmentStream,
    PipelineError, Roundtable, StageSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Conversational(ParticipantId),
    Technical(ParticipantId),
    Debate(ParticipantId),
    Synthesis,
    Shots,
    Breakdown,
}

pub fn classify(request: &CompletionRequest) -> CallKind {
    let system = request.system_text();
    if system.starts_with("You are the producer") {
        return CallKind::Synthesis;
    }
    if system.starts_with("You are a first assistant director") {
        return CallKind::Shots;
    }
    if system.starts_with("You write discovery tags") {
        return CallKind::Breakdown;
    }

    let speaker = ROSTER
        .iter()
        .find(|p| system.starts_with(&format!("You are the {} on", p.name)))
        .map(|p| p.id)
        .unwrap_or_else(|| panic!("unrecognized prompt: {system}"));

    if system.contains("live debate") {
        CallKind::Debate(speaker)
    } else if request.user_text().contains("YOUR TECHNICAL NOTES") {
        CallKind::Technical(speaker)
    } else {
        CallKind::Conversational(speaker)
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(CompletionError),
    /// Streams these fragments, then fails.
    Partial(Vec<String>, CompletionError),
    /// Never answers.
    Hang,
    /// Waits for every party of the barrier, then answers with the
    /// default text.
    Barrier(Arc<tokio::sync::Barrier>),
}

pub fn default_text(kind: CallKind) -> String {
    match kind {
        CallKind::Conversational(id) => format!("{id} take: let the sun do the work."),
        CallKind::Technical(id) => format!("- {id} note one\n- {id} note two"),
        CallKind::Debate(id) => format!("{id} pushes back: go further."),
        CallKind::Synthesis => SYNTHESIS_SECTIONS
            .iter()
            .map(|label| format!("{label}: golden light over calm water."))
            .collect::<Vec<_>>()
            .join("\n"),
        CallKind::Shots => "00:00-00:03 | Hook | 24mm, slow push-in | Sun touches the horizon.\n\
                            00:03-00:08 | Reveal | 85mm, locked off | The sea turns amber."
            .to_string(),
        CallKind::Breakdown => r##"["#sunset", "#ocean", "tiktok"]"##.to_string(),
    }
}

pub fn http_error(status: u16) -> CompletionError {
    CompletionError::Http {
        status,
        body: "scripted failure".into(),
    }
}

pub fn rate_limited() -> CompletionError {
    CompletionError::RateLimited {
        retry_after: None,
        message: "scripted 429".into(),
    }
}

#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<HashMap<CallKind, VecDeque<Reply>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `reply` for the next call of `kind`.
    pub fn script(self: &Arc<Self>, kind: CallKind, reply: Reply) -> Arc<Self> {
        self.script
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(reply);
        self.clone()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, kind: CallKind) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| classify(r) == kind)
            .collect()
    }

    fn next_reply(&self, request: &CompletionRequest) -> (CallKind, Reply) {
        self.requests.lock().unwrap().push(request.clone());
        let kind = classify(request);
        let queued = self
            .script
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front());
        (kind, queued.unwrap_or_else(|| Reply::Text(default_text(kind))))
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let (kind, reply) = self.next_reply(request);
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(error) | Reply::Partial(_, error) => Err(error),
            Reply::Hang => futures::future::pending().await,
            Reply::Barrier(barrier) => {
                barrier.wait().await;
                Ok(default_text(kind))
            }
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, CompletionError> {
        let (kind, reply) = self.next_reply(request);
        let reply = match reply {
            Reply::Barrier(barrier) => {
                barrier.wait().await;
                Reply::Text(default_text(kind))
            }
            other => other,
        };
        let items: Vec<Result<String, CompletionError>> = match reply {
            Reply::Text(text) => text
                .split_inclusive(' ')
                .map(|fragment| Ok(fragment.to_string()))
                .collect(),
            Reply::Fail(error) => return Err(error),
            Reply::Partial(fragments, error) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(error)))
                .collect(),
            Reply::Hang | Reply::Barrier(_) => return futures::future::pending().await,
        };
        Ok(futures::stream::iter(items).boxed())
    }
}

pub fn sunset_input() -> RoundtableInput {
    RoundtableInput::new("A cinematic shot of a sunset over the ocean", "TikTok")
}

pub fn roundtable(provider: &Arc<ScriptedProvider>) -> Roundtable {
    roundtable_with_policy(provider, RetryPolicy::none())
}

pub fn roundtable_with_policy(provider: &Arc<ScriptedProvider>, policy: RetryPolicy) -> Roundtable {
    let client = CompletionClient::new(provider.clone(), policy);
    Roundtable::new(client, StageSettings::default())
}

/// Run once on a fresh bus and return the outcome with every event.
pub async fn run_collect(
    roundtable: &Roundtable,
    input: &RoundtableInput,
) -> (Result<RunResult, PipelineError>, Vec<EventEnvelope>) {
    let bus = EventBus::with_capacity(4096);
    let mut rx = bus.subscribe();
    let outcome = roundtable.run(input, &bus).await;
    (outcome, drain(&mut rx))
}

pub fn event_types(events: &[EventEnvelope]) -> Vec<&'static str> {
    events.iter().map(|e| e.event_type()).collect()
}

pub fn count(events: &[EventEnvelope], event_type: &str) -> usize {
    events.iter().filter(|e| e.event_type() == event_type).count()
}

pub fn status_stages(events: &[EventEnvelope]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.event {
            RoundtableEvent::Status { stage, .. } => Some(stage.clone()),
            _ => None,
        })
        .collect()
}
