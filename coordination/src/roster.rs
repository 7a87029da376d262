//! The fixed roundtable roster.
//!
//! Five creative roles, in speaking order. The table is process-wide
//! static data; runs only ever borrow from it.

use serde::{Deserialize, Serialize};

use crate::input::RoundtableInput;

/// Identifier of a roster participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantId {
    Director,
    Cinematographer,
    Editor,
    Colorist,
    PlatformExpert,
}

impl ParticipantId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Director => "director",
            Self::Cinematographer => "cinematographer",
            Self::Editor => "editor",
            Self::Colorist => "colorist",
            Self::PlatformExpert => "platform_expert",
        }
    }

    /// The roster entry for this identifier.
    pub fn participant(self) -> &'static Participant {
        // ROSTER is declared in the same order as the enum.
        &ROSTER[self as usize]
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A roster entry.
pub struct Participant {
    pub id: ParticipantId,
    pub name: &'static str,
    pub emoji: &'static str,
    /// One-line description of the role, used in system prompts.
    pub role: &'static str,
    /// Builds the specialty section of this participant's technical prompt.
    pub technical_focus: fn(&RoundtableInput) -> String,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("emoji", &self.emoji)
            .finish_non_exhaustive()
    }
}

/// Speaking order for the roundtable.
pub static ROSTER: [Participant; 5] = [
    Participant {
        id: ParticipantId::Director,
        name: "Director",
        emoji: "🎬",
        role: "owns the story, emotional arc and overall creative vision",
        technical_focus: director_focus,
    },
    Participant {
        id: ParticipantId::Cinematographer,
        name: "Cinematographer",
        emoji: "🎥",
        role: "owns framing, lensing, camera movement and lighting",
        technical_focus: cinematographer_focus,
    },
    Participant {
        id: ParticipantId::Editor,
        name: "Editor",
        emoji: "✂️",
        role: "owns pacing, rhythm, transitions and shot duration",
        technical_focus: editor_focus,
    },
    Participant {
        id: ParticipantId::Colorist,
        name: "Colorist",
        emoji: "🎨",
        role: "owns palette, contrast, grade and texture",
        technical_focus: colorist_focus,
    },
    Participant {
        id: ParticipantId::PlatformExpert,
        name: "Platform Expert",
        emoji: "📱",
        role: "owns format, hook timing and what performs on the target platform",
        technical_focus: platform_focus,
    },
];

/// Iterate the roster in speaking order.
pub fn roster() -> &'static [Participant] {
    &ROSTER
}

fn director_focus(_input: &RoundtableInput) -> String {
    "List the story beats in order, the emotional target of each beat, \
     the performance direction for any characters, and the single image \
     the audience should remember."
        .to_string()
}

fn cinematographer_focus(_input: &RoundtableInput) -> String {
    "Specify shot sizes, focal lengths in mm, camera height and movement \
     (static, dolly, gimbal, handheld, drone), lighting setup with key \
     direction and quality, and time of day."
        .to_string()
}

fn editor_focus(_input: &RoundtableInput) -> String {
    "Specify the total runtime, the cut rhythm in seconds per shot, \
     transition types, where the hook lands, and any speed ramps or \
     match cuts."
        .to_string()
}

fn colorist_focus(_input: &RoundtableInput) -> String {
    "Specify the palette as named colors, contrast and saturation levels, \
     highlight and shadow tint, film emulation or grain, and how the grade \
     evolves across the piece."
        .to_string()
}

fn platform_focus(input: &RoundtableInput) -> String {
    format!(
        "Specify what performs on {platform}: aspect ratio, safe zones, \
         ideal length, hook in the first seconds, caption and on-screen \
         text conventions, and audio or trend considerations for {platform}.",
        platform = input.platform
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_order_matches_ids() {
        let ids: Vec<ParticipantId> = roster().iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![
                ParticipantId::Director,
                ParticipantId::Cinematographer,
                ParticipantId::Editor,
                ParticipantId::Colorist,
                ParticipantId::PlatformExpert,
            ]
        );
        for p in roster() {
            assert_eq!(p.id.participant().name, p.name);
        }
    }

    #[test]
    fn test_id_serializes_snake_case() {
        let json = serde_json::to_string(&ParticipantId::PlatformExpert).unwrap();
        assert_eq!(json, "\"platform_expert\"");
        assert_eq!(ParticipantId::PlatformExpert.to_string(), "platform_expert");
    }

    #[test]
    fn test_platform_focus_names_platform() {
        let input = RoundtableInput::new("brief", "TikTok");
        let focus = (ParticipantId::PlatformExpert.participant().technical_focus)(&input);
        assert!(focus.contains("TikTok"));
    }
}
