//! Prompt templates for every roundtable call.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever template content
//! changes, so a logged run can be tied to the prompts that produced it.

use crate::debate::{DebateTurn, TurnKind};
use crate::input::RoundtableInput;
use crate::result::ParticipantResponse;
use crate::roster::Participant;

/// Prompt version. Bump on any template content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Header of the synthesis section that lists every participant's input.
pub const TEAM_INSIGHTS_HEADER: &str = "TEAM INSIGHTS";

/// Field delimiter in shot list lines.
pub const SHOT_DELIMITER: &str = " | ";

/// Labeled sections the synthesis prompt asks for, in order.
pub const SYNTHESIS_SECTIONS: [&str; 5] = [
    "Story & Direction",
    "Camera & Lighting",
    "Edit & Pacing",
    "Color & Texture",
    "Format & Look",
];

/// System and user text for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

fn preamble(participant: &Participant) -> String {
    format!(
        "You are the {} on a creative roundtable planning a short video. \
         You {}. Speak in first person, be concrete, and stay in your lane.",
        participant.name, participant.role
    )
}

fn brief_block(input: &RoundtableInput, context: &str) -> String {
    let mut block = format!(
        "CREATIVE BRIEF\n{}\n\nPLATFORM\n{}",
        input.brief.trim(),
        input.platform.trim()
    );
    if !context.is_empty() {
        block.push_str("\n\n");
        block.push_str(context);
    }
    block
}

/// Conversational pass prompt.
///
/// `predecessors` are the participants who already spoke this round,
/// with their text; empty contributions are left out.
pub fn conversational_prompt(
    participant: &Participant,
    input: &RoundtableInput,
    context: &str,
    predecessors: &[(&Participant, &str)],
) -> PromptPair {
    let mut user = brief_block(input, context);

    let spoken: Vec<String> = predecessors
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(p, text)| format!("{} said:\n\"{}\"", p.name, text.trim()))
        .collect();

    if spoken.is_empty() {
        user.push_str(&format!(
            "\n\nYou open the discussion. In 2-4 sentences, give your first \
             take on how this should feel and look on {}.",
            input.platform
        ));
    } else {
        user.push_str("\n\nSO FAR AT THE TABLE\n");
        user.push_str(&spoken.join("\n\n"));
        user.push_str(
            "\n\nReact to what was just said: build on it or push back by name, \
             then add your own angle. 2-4 sentences.",
        );
    }

    PromptPair {
        system: preamble(participant),
        user,
    }
}

/// Technical pass prompt.
///
/// Sees every conversational contribution, never another participant's
/// technical output.
pub fn technical_prompt(
    participant: &Participant,
    input: &RoundtableInput,
    context: &str,
    conversations: &[(&Participant, &str)],
) -> PromptPair {
    let mut user = brief_block(input, context);

    let discussion: Vec<String> = conversations
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(p, text)| format!("{}: {}", p.name, text.trim()))
        .collect();
    if !discussion.is_empty() {
        user.push_str("\n\nROUNDTABLE DISCUSSION\n");
        user.push_str(&discussion.join("\n"));
    }

    user.push_str("\n\nYOUR TECHNICAL NOTES\n");
    user.push_str(&(participant.technical_focus)(input));
    user.push_str("\nAnswer as a compact bulleted list. No preamble.");

    PromptPair {
        system: format!(
            "{} Give precise, production-ready technical direction.",
            preamble(participant)
        ),
        user,
    }
}

/// Prompt for one debate turn.
///
/// A challenge answers the opponent's Round 1 position; a response
/// answers the challenge it received.
pub fn debate_prompt(
    kind: TurnKind,
    speaker: &Participant,
    opponent: &Participant,
    input: &RoundtableInput,
    opponent_text: &str,
) -> PromptPair {
    let quoted = if opponent_text.trim().is_empty() {
        "(no statement)".to_string()
    } else {
        format!("\"{}\"", opponent_text.trim())
    };

    let user = match kind {
        TurnKind::Challenge => format!(
            "Brief: {}\nPlatform: {}\n\nThe {} proposed:\n{}\n\n\
             Challenge this directly. Name the weakest creative choice, say why \
             it will not land on {}, and propose a bolder alternative. 3-5 sentences.",
            input.brief.trim(),
            input.platform,
            opponent.name,
            quoted,
            input.platform
        ),
        TurnKind::Response => format!(
            "Brief: {}\nPlatform: {}\n\nThe {} challenged you:\n{}\n\n\
             Respond directly. Concede what is right, defend what matters, \
             and land on a concrete compromise. 3-5 sentences.",
            input.brief.trim(),
            input.platform,
            opponent.name,
            quoted
        ),
    };

    PromptPair {
        system: format!(
            "{} This is a live debate with the {}; address them directly.",
            preamble(speaker),
            opponent.name
        ),
        user,
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Name: text` line for the team insights section.
pub fn insight_line(response: &ParticipantResponse) -> String {
    let combined = [
        one_line(&response.conversational_response),
        one_line(&response.technical_response),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    if combined.is_empty() {
        format!("{}: (no contribution)", response.name)
    } else {
        format!("{}: {}", response.name, combined)
    }
}

/// Synthesis prompt over every participant's output and the debate.
pub fn synthesis_prompt(
    input: &RoundtableInput,
    context: &str,
    responses: &[ParticipantResponse],
    debate: &[DebateTurn],
) -> PromptPair {
    let mut user = brief_block(input, context);

    user.push_str(&format!("\n\n{}\n", TEAM_INSIGHTS_HEADER));
    user.push_str(
        &responses
            .iter()
            .map(insight_line)
            .collect::<Vec<_>>()
            .join("\n"),
    );

    let exchanges: Vec<String> = debate
        .iter()
        .filter(|t| !t.content.trim().is_empty())
        .map(|t| {
            format!(
                "{} → {}: {}",
                t.from.participant().name,
                t.to.participant().name,
                one_line(&t.content)
            )
        })
        .collect();
    if !exchanges.is_empty() {
        user.push_str("\n\nDEBATE\n");
        user.push_str(&exchanges.join("\n"));
    }

    user.push_str(&format!(
        "\n\nWrite the final creative prompt for {}. Use these labeled sections:\n{}\n\
         Resolve disagreements decisively. Output only the prompt.",
        input.platform,
        SYNTHESIS_SECTIONS.join("\n")
    ));

    PromptPair {
        system: "You are the producer closing a creative roundtable. Merge the team's \
                 input into one coherent, specific brief a video model or crew can execute."
            .to_string(),
        user,
    }
}

/// Section labels the synthesized prompt left out. Downstream stages
/// accept a prompt with missing sections; this only feeds diagnostics.
pub fn missing_sections(final_prompt: &str) -> Vec<&'static str> {
    SYNTHESIS_SECTIONS
        .iter()
        .copied()
        .filter(|label| !final_prompt.contains(label))
        .collect()
}

/// Shot list prompt for a synthesized brief.
pub fn shot_list_prompt(input: &RoundtableInput, final_prompt: &str) -> PromptPair {
    PromptPair {
        system: "You are a first assistant director turning a creative brief into a \
                 shooting plan."
            .to_string(),
        user: format!(
            "Platform: {platform}\n\nFINAL PROMPT\n{prompt}\n\n\
             Write a timecoded shot list, one shot per line, in exactly this form:\n\
             MM:SS-MM:SS{d}Label{d}Camera (focal length, movement){d}Visual description\n\
             Example:\n00:00-00:03{d}Hook{d}24mm, slow push-in{d}Sun touches the horizon.\n\
             Cover the full runtime with no gaps. Output only the lines.",
            platform = input.platform,
            prompt = final_prompt.trim(),
            d = SHOT_DELIMITER
        ),
    }
}

/// Hashtag prompt; the reply is expected to be a JSON array of strings.
pub fn breakdown_prompt(input: &RoundtableInput, final_prompt: &str) -> PromptPair {
    PromptPair {
        system: "You write discovery tags for short-form video. Reply with JSON only.".to_string(),
        user: format!(
            "Platform: {}\n\nFINAL PROMPT\n{}\n\n\
             Return a JSON array of 5-10 short hashtag strings for this video, \
             e.g. [\"#sunset\", \"#oceanvibes\"]. No other text.",
            input.platform,
            final_prompt.trim()
        ),
    }
}
