//! Debate flow test: drives exchanges and prompt templates together
//! with canned turn text (no model calls).
//!
//! Covers: plan ↔ exchange state machine ↔ debate prompts ↔ synthesis
//! prompt running in a single pass.

use coordination::debate::{DebatePairing, DebatePhase, DebatePlan, TurnKind};
use coordination::prompts::{debate_prompt, synthesis_prompt};
use coordination::{
    roster, DebateExchange, DebateTurn, ParticipantId, ParticipantResponse, RoundtableInput,
};

fn input() -> RoundtableInput {
    RoundtableInput::new("A cinematic shot of a sunset over the ocean", "TikTok")
}

/// Helper: Round 1 output where everyone said one sentence.
fn round1_responses() -> Vec<ParticipantResponse> {
    roster()
        .iter()
        .map(|p| {
            let mut response = ParticipantResponse::new(p);
            response.conversational_response = format!("{} wants it warm.", p.name);
            response
        })
        .collect()
}

/// Helper: run one exchange, answering each turn with `reply(kind)`.
fn play(
    pairing: DebatePairing,
    responses: &[ParticipantResponse],
    reply: impl Fn(TurnKind) -> (String, Option<String>),
) -> (DebateExchange, Vec<String>) {
    let mut exchange = DebateExchange::new(pairing);
    let mut prompts = Vec::new();
    exchange.start().unwrap();

    while let Some((kind, from, to)) = exchange.next_turn() {
        let opponent_text = match kind {
            TurnKind::Challenge => responses
                .iter()
                .find(|r| r.agent == to)
                .map(|r| r.conversational_response.clone())
                .unwrap_or_default(),
            TurnKind::Response => exchange
                .challenge()
                .map(|t| t.content.clone())
                .unwrap_or_default(),
        };
        let prompt = debate_prompt(
            kind,
            from.participant(),
            to.participant(),
            &input(),
            &opponent_text,
        );
        prompts.push(prompt.user);

        let (content, error) = reply(kind);
        exchange.record_turn(content, error).unwrap();
    }
    (exchange, prompts)
}

// ── Default plan ────────────────────────────────────────────────────

#[test]
fn test_default_plan_full_exchange() {
    let plan = DebatePlan::default();
    assert_eq!(plan.pairings.len(), 1);

    let responses = round1_responses();
    let (exchange, prompts) = play(plan.pairings[0], &responses, |kind| match kind {
        TurnKind::Challenge => ("Warm is a cliché.".to_string(), None),
        TurnKind::Response => ("Then cool the shadows.".to_string(), None),
    });

    assert_eq!(exchange.phase, DebatePhase::Done);
    assert_eq!(exchange.turns.len(), 2);
    assert_eq!(exchange.turns[0].from, ParticipantId::Director);
    assert_eq!(exchange.turns[1].from, ParticipantId::Cinematographer);

    // The challenge quotes the responder's Round 1 position, the response
    // quotes the challenge.
    assert!(prompts[0].contains("Cinematographer wants it warm."));
    assert!(prompts[1].contains("Warm is a cliché."));
}

// ── Failure and multi-pairing ───────────────────────────────────────

#[test]
fn test_failed_challenge_still_reaches_response() {
    let responses = round1_responses();
    let (exchange, prompts) = play(DebatePlan::default().pairings[0], &responses, |kind| {
        match kind {
            TurnKind::Challenge => (String::new(), Some("stream interrupted".to_string())),
            TurnKind::Response => ("Nothing to answer.".to_string(), None),
        }
    });

    assert!(exchange.is_complete());
    assert!(exchange.challenge().unwrap().error.is_some());
    assert!(prompts[1].contains("(no statement)"));
}

#[test]
fn test_extra_pairings_feed_synthesis() {
    let plan = DebatePlan::new(vec![
        DebatePairing::new(ParticipantId::Director, ParticipantId::Cinematographer),
        DebatePairing::new(ParticipantId::Editor, ParticipantId::Colorist),
    ]);
    let responses = round1_responses();

    let turns: Vec<DebateTurn> = plan
        .pairings
        .iter()
        .flat_map(|pairing| {
            let (exchange, _) = play(*pairing, &responses, |kind| {
                (format!("{:?} from {}", kind, pairing.challenger), None)
            });
            exchange.turns
        })
        .collect();
    assert_eq!(turns.len(), 4);

    let prompt = synthesis_prompt(&input(), "", &responses, &turns);
    assert!(prompt.user.contains("DEBATE\n"));
    assert!(prompt.user.contains("Editor → Colorist"));
    assert!(prompt.user.contains("Colorist → Editor"));
}
