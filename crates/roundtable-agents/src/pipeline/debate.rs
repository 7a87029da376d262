//! Round 2: streamed challenge/response exchanges.

use coordination::{
    prompts, DebateExchange, DebatePhase, DebatePlan, ParticipantResponse, RoundtableEvent,
    RunStage, TurnKind,
};
use tracing::{info, warn};

use super::{PipelineError, StageContext, StreamFailure};
use crate::completion::CompletionRequest;

pub(crate) async fn run(
    ctx: &StageContext<'_>,
    plan: &DebatePlan,
    responses: &[ParticipantResponse],
) -> Result<Vec<DebateExchange>, PipelineError> {
    let mut exchanges = Vec::with_capacity(plan.pairings.len());

    for pairing in &plan.pairings {
        let challenger = pairing.challenger.participant();
        let responder = pairing.responder.participant();
        ctx.bus.publish(RoundtableEvent::DebateStart {
            challenger: challenger.id,
            challenger_name: challenger.name.to_string(),
            challenger_emoji: challenger.emoji.to_string(),
            responder: responder.id,
            responder_name: responder.name.to_string(),
            responder_emoji: responder.emoji.to_string(),
        });

        let mut exchange = DebateExchange::new(*pairing);
        exchange.start()?;

        while let Some((kind, from, to)) = exchange.next_turn() {
            let speaker = from.participant();
            let opponent = to.participant();
            let opponent_text = match kind {
                TurnKind::Challenge => responses
                    .iter()
                    .find(|r| r.agent == to)
                    .map(|r| r.conversational_response.as_str())
                    .unwrap_or(""),
                TurnKind::Response => exchange
                    .challenge()
                    .map(|t| t.content.as_str())
                    .unwrap_or(""),
            };
            let prompt = prompts::debate_prompt(kind, speaker, opponent, ctx.input, opponent_text);
            let request = CompletionRequest::new(&prompt, ctx.stages.debate, true);

            let streamed = ctx
                .stream_text(&request, |content| RoundtableEvent::DebateChunk {
                    from,
                    from_name: speaker.name.to_string(),
                    content,
                })
                .await;

            let (content, error) = match streamed {
                Ok(text) => (text, None),
                Err(StreamFailure::Cancelled) => {
                    exchange.transition(DebatePhase::Aborted, "run cancelled")?;
                    return Err(PipelineError::Cancelled {
                        stage: RunStage::Round2,
                    });
                }
                Err(StreamFailure::Provider { partial, error }) => {
                    warn!(agent = %from, turn = ?kind, error = %error, "Debate turn failed");
                    ctx.bus.publish(RoundtableEvent::AgentError {
                        agent: from,
                        error: error.to_string(),
                    });
                    (partial, Some(error.to_string()))
                }
            };

            ctx.bus.publish(RoundtableEvent::DebateMessage {
                from,
                to,
                content: content.clone(),
            });
            exchange.record_turn(content, error)?;
        }

        info!(
            challenger = %pairing.challenger,
            responder = %pairing.responder,
            failed_turns = exchange.turns.iter().filter(|t| t.error.is_some()).count(),
            "Debate exchange finished"
        );
        exchanges.push(exchange);
    }

    ctx.bus.publish(RoundtableEvent::DebateComplete {
        message: "Debate complete".to_string(),
    });
    Ok(exchanges)
}
