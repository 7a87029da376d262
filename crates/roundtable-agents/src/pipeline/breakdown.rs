//! Breakdown: discovery tags for the final prompt.
//!
//! Tags are cosmetic. A failed call or an unparseable reply yields an
//! empty list and the run still completes.

use coordination::{parse_hashtags, prompts, RoundtableEvent, RunStage};
use tracing::{debug, warn};

use super::{PipelineError, StageContext};
use crate::completion::CompletionRequest;

pub(crate) async fn hashtags(
    ctx: &StageContext<'_>,
    final_prompt: &str,
) -> Result<Vec<String>, PipelineError> {
    ctx.bus.publish(RoundtableEvent::BreakdownStart {
        message: "Generating discovery tags".to_string(),
    });

    let prompt = prompts::breakdown_prompt(ctx.input, final_prompt);
    let request = CompletionRequest::new(&prompt, ctx.stages.breakdown, false);

    match ctx
        .guard(RunStage::Breakdown, ctx.client.complete(&request))
        .await?
    {
        Ok(reply) => {
            let tags = parse_hashtags(&reply);
            if tags.is_empty() {
                debug!(reply_chars = reply.len(), "No hashtags parsed from reply");
            }
            Ok(tags)
        }
        Err(e) => {
            warn!(error = %e, "Hashtag generation failed, continuing without tags");
            Ok(Vec::new())
        }
    }
}
