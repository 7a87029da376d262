//! Round 1: conversational pass in roster order, then a concurrent
//! technical pass.

use coordination::stream::chunk_paragraphs;
use coordination::{prompts, roster, Participant, ParticipantResponse, RoundtableEvent, RunStage};
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{PipelineError, StageContext};
use crate::completion::CompletionRequest;

/// Sub-stage status published once every Round 1 slot has settled.
pub const ROUND1_COMPLETE: &str = "round1_complete";

/// Progress through Round 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Conversational,
    Technical,
    Done,
}

impl Phase {
    fn next(self) -> Self {
        match self {
            Self::Idle => Self::Conversational,
            Self::Conversational => Self::Technical,
            Self::Technical | Self::Done => Self::Done,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Conversational => write!(f, "conversational"),
            Self::Technical => write!(f, "technical"),
            Self::Done => write!(f, "done"),
        }
    }
}

fn advance(phase: &mut Phase) {
    let next = phase.next();
    debug!(from = %phase, to = %next, "Round 1 phase");
    *phase = next;
}

pub(crate) async fn run(ctx: &StageContext<'_>) -> Result<Vec<ParticipantResponse>, PipelineError> {
    let mut phase = Phase::Idle;
    let mut responses: Vec<ParticipantResponse> =
        roster().iter().map(ParticipantResponse::new).collect();

    advance(&mut phase);
    for (index, participant) in roster().iter().enumerate() {
        let text = converse(ctx, participant, &responses[..index]).await?;
        match text {
            Ok(text) => responses[index].conversational_response = text,
            Err(error) => responses[index].conversational_error = Some(error),
        }
    }

    advance(&mut phase);
    technical_pass(ctx, &mut responses).await?;
    advance(&mut phase);

    let degraded = responses.iter().filter(|r| r.is_degraded()).count();
    info!(degraded, "Round 1 settled");
    ctx.bus.publish(RoundtableEvent::status(
        ROUND1_COMPLETE,
        "Round 1 complete: every voice is in",
    ));
    Ok(responses)
}

/// One conversational turn. The inner result is the participant's text or
/// the error that replaced it; only cancellation escapes as `Err`.
async fn converse(
    ctx: &StageContext<'_>,
    participant: &Participant,
    earlier: &[ParticipantResponse],
) -> Result<Result<String, String>, PipelineError> {
    let predecessors: Vec<(&Participant, &str)> = roster()
        .iter()
        .zip(earlier)
        .map(|(p, r)| (p, r.conversational_response.as_str()))
        .collect();
    let prompt = prompts::conversational_prompt(participant, ctx.input, ctx.context, &predecessors);
    let request = CompletionRequest::new(&prompt, ctx.stages.conversational, false);

    ctx.bus.publish(RoundtableEvent::TypingStart {
        agent: participant.id,
        name: participant.name.to_string(),
    });
    debug!(agent = %participant.id, phase = %Phase::Conversational, "Calling participant");

    let outcome = ctx
        .guard(RunStage::Round1, ctx.client.complete(&request))
        .await;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(cancelled) => {
            ctx.bus.publish(typing_stop(participant));
            return Err(cancelled);
        }
    };

    let (text, error) = match outcome {
        Ok(text) => {
            ctx.bus.publish(typing_stop(participant));
            let text = text.trim().to_string();
            let chunks = chunk_paragraphs(&text);
            if chunks.is_empty() {
                ctx.bus.publish(message_chunk(participant, ""));
            }
            for chunk in chunks {
                ctx.bus.publish(message_chunk(participant, chunk));
            }
            (text, None)
        }
        Err(e) => {
            warn!(
                agent = %participant.id,
                phase = %Phase::Conversational,
                error = %e,
                "Participant call failed"
            );
            ctx.bus.publish(RoundtableEvent::AgentError {
                agent: participant.id,
                error: e.to_string(),
            });
            ctx.bus.publish(typing_stop(participant));
            (String::new(), Some(e.to_string()))
        }
    };

    ctx.bus.publish(RoundtableEvent::MessageComplete {
        agent: participant.id,
        name: participant.name.to_string(),
        emoji: participant.emoji.to_string(),
        conversational_response: text.clone(),
    });

    Ok(match error {
        None => Ok(text),
        Some(error) => Err(error),
    })
}

/// Every participant's technical call at once. Each call fills only its
/// own slot, and slots are written after all calls have settled.
async fn technical_pass(
    ctx: &StageContext<'_>,
    responses: &mut [ParticipantResponse],
) -> Result<(), PipelineError> {
    let conversations: Vec<(&Participant, &str)> = roster()
        .iter()
        .zip(responses.iter())
        .map(|(p, r)| (p, r.conversational_response.as_str()))
        .collect();

    let requests: Vec<CompletionRequest> = roster()
        .iter()
        .map(|participant| {
            let prompt =
                prompts::technical_prompt(participant, ctx.input, ctx.context, &conversations);
            CompletionRequest::new(&prompt, ctx.stages.technical, false)
        })
        .collect();

    let calls = requests.iter().map(|request| ctx.client.complete(request));
    let settled = ctx.guard(RunStage::Round1, join_all(calls)).await?;

    for ((slot, participant), outcome) in responses.iter_mut().zip(roster()).zip(settled) {
        match outcome {
            Ok(text) => slot.technical_response = text.trim().to_string(),
            Err(e) => {
                warn!(
                    agent = %participant.id,
                    phase = %Phase::Technical,
                    error = %e,
                    "Participant call failed"
                );
                ctx.bus.publish(RoundtableEvent::AgentError {
                    agent: participant.id,
                    error: e.to_string(),
                });
                slot.technical_error = Some(e.to_string());
            }
        }
    }
    Ok(())
}

fn typing_stop(participant: &Participant) -> RoundtableEvent {
    RoundtableEvent::TypingStop {
        agent: participant.id,
        name: participant.name.to_string(),
    }
}

fn message_chunk(participant: &Participant, content: &str) -> RoundtableEvent {
    RoundtableEvent::MessageChunk {
        agent: participant.id,
        content: content.to_string(),
    }
}
