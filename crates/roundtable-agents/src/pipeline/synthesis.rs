//! Synthesis and shot list: the two stage-critical streamed calls.

use coordination::prompts;
use coordination::result::character_count;
use coordination::{DebateTurn, ParticipantResponse, RoundtableEvent, RunStage};
use tracing::{debug, info};

use super::{PipelineError, StageContext};
use crate::completion::CompletionRequest;

/// Merge every contribution into the final prompt.
pub(crate) async fn synthesize(
    ctx: &StageContext<'_>,
    responses: &[ParticipantResponse],
    debate: &[DebateTurn],
) -> Result<String, PipelineError> {
    let prompt = prompts::synthesis_prompt(ctx.input, ctx.context, responses, debate);
    let request = CompletionRequest::new(&prompt, ctx.stages.synthesis, true);

    let final_prompt = ctx
        .stream_critical(RunStage::Synthesis, &request, |content| {
            RoundtableEvent::SynthesisChunk { content }
        })
        .await?;

    let missing = prompts::missing_sections(&final_prompt);
    if !missing.is_empty() {
        debug!(?missing, "Synthesized prompt is missing sections");
    }

    let characters = character_count(&final_prompt);
    info!(characters, "Final prompt synthesized");
    ctx.bus.publish(RoundtableEvent::SynthesisComplete {
        optimized_prompt: final_prompt.clone(),
        character_count: characters,
    });
    Ok(final_prompt)
}

/// Timecoded shot list for the final prompt.
pub(crate) async fn shot_list(
    ctx: &StageContext<'_>,
    final_prompt: &str,
) -> Result<String, PipelineError> {
    let prompt = prompts::shot_list_prompt(ctx.input, final_prompt);
    let request = CompletionRequest::new(&prompt, ctx.stages.shots, true);

    let shots = ctx
        .stream_critical(RunStage::Shots, &request, |content| {
            RoundtableEvent::ShotsChunk { content }
        })
        .await?;

    info!(lines = shots.lines().count(), "Shot list ready");
    ctx.bus.publish(RoundtableEvent::ShotsComplete {
        suggested_shots: shots.clone(),
    });
    Ok(shots)
}
