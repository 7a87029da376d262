//! Shared context block injected into every participant prompt.
//!
//! Only sections with content are rendered, always in the same order:
//!
//! ```text
//! VISUAL TEMPLATE → CHARACTERS → VOICE PROFILES → SCREENPLAY EXCERPT
//!   → SETTINGS → PLATFORM STYLE HINTS
//! ```

use crate::input::RoundtableInput;

pub const VISUAL_TEMPLATE_HEADER: &str = "VISUAL TEMPLATE";
pub const CHARACTERS_HEADER: &str = "CHARACTERS";
pub const VOICE_PROFILES_HEADER: &str = "VOICE PROFILES";
pub const SCREENPLAY_HEADER: &str = "SCREENPLAY EXCERPT";
pub const SETTINGS_HEADER: &str = "SETTINGS";
pub const STYLE_HINTS_HEADER: &str = "PLATFORM STYLE HINTS";

/// Screenplay excerpts longer than this (in chars) are cut.
pub const SCREENPLAY_EXCERPT_LIMIT: usize = 4000;

const TRUNCATION_MARKER: &str = "[...]";

/// Render the shared context block for `input`.
///
/// Returns an empty string when no optional section has content.
pub fn assemble_context(input: &RoundtableInput) -> String {
    let mut sections: Vec<(&str, String)> = Vec::new();

    if let Some(text) = non_blank(input.visual_template.as_deref()) {
        sections.push((VISUAL_TEMPLATE_HEADER, text.to_string()));
    }
    if let Some(text) = non_blank(input.characters.as_deref()) {
        sections.push((CHARACTERS_HEADER, text.to_string()));
    }

    let voices: Vec<String> = input
        .voice_profiles
        .iter()
        .filter(|(name, voice)| !name.trim().is_empty() && !voice.trim().is_empty())
        .map(|(name, voice)| format!("- {}: {}", name.trim(), voice.trim()))
        .collect();
    if !voices.is_empty() {
        sections.push((VOICE_PROFILES_HEADER, voices.join("\n")));
    }

    if let Some(text) = non_blank(input.screenplay.as_deref()) {
        sections.push((SCREENPLAY_HEADER, excerpt(text, SCREENPLAY_EXCERPT_LIMIT)));
    }
    if let Some(text) = non_blank(input.settings.as_deref()) {
        sections.push((SETTINGS_HEADER, text.to_string()));
    }

    if let Some(settings) = &input.platform_settings {
        let hints = settings.hints();
        if !hints.is_empty() {
            let body = hints
                .iter()
                .map(|(label, value)| format!("- {}: {}", label, value.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push((STYLE_HINTS_HEADER, body));
        }
    }

    sections
        .into_iter()
        .map(|(header, body)| format!("## {}\n{}", header, body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}\n{}", text[..cut].trim_end(), TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
