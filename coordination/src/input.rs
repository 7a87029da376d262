//! Run configuration supplied by the caller for one roundtable.
//!
//! A `RoundtableInput` is built once per invocation and never mutated
//! afterwards; every stage borrows it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured style hints for the target platform.
///
/// All fields are optional. An instance with nothing set (or only
/// whitespace) is considered empty and renders no context section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformSettings {
    pub camera: Option<String>,
    pub lighting: Option<String>,
    pub palette: Option<String>,
    pub tone: Option<String>,
    /// Free-form hints not covered by the named fields.
    pub extra: BTreeMap<String, String>,
}

impl PlatformSettings {
    /// Named hints followed by the extra ones, skipping blank values.
    pub fn hints(&self) -> Vec<(&str, &str)> {
        let named = [
            ("Camera", self.camera.as_deref()),
            ("Lighting", self.lighting.as_deref()),
            ("Palette", self.palette.as_deref()),
            ("Tone", self.tone.as_deref()),
        ];

        named
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| (label, v)))
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hints().is_empty()
    }
}

/// Immutable configuration for a single roundtable run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundtableInput {
    /// The creative brief.
    pub brief: String,
    /// Target platform, e.g. "TikTok".
    pub platform: String,
    #[serde(default)]
    pub visual_template: Option<String>,
    #[serde(default)]
    pub characters: Option<String>,
    #[serde(default)]
    pub screenplay: Option<String>,
    #[serde(default)]
    pub settings: Option<String>,
    /// Character name → voice description.
    #[serde(default)]
    pub voice_profiles: BTreeMap<String, String>,
    #[serde(default)]
    pub platform_settings: Option<PlatformSettings>,
}

impl RoundtableInput {
    pub fn new(brief: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            brief: brief.into(),
            platform: platform.into(),
            ..Self::default()
        }
    }

    pub fn with_visual_template(mut self, template: impl Into<String>) -> Self {
        self.visual_template = Some(template.into());
        self
    }

    pub fn with_characters(mut self, characters: impl Into<String>) -> Self {
        self.characters = Some(characters.into());
        self
    }

    pub fn with_screenplay(mut self, screenplay: impl Into<String>) -> Self {
        self.screenplay = Some(screenplay.into());
        self
    }

    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = Some(settings.into());
        self
    }

    pub fn with_voice(mut self, character: impl Into<String>, voice: impl Into<String>) -> Self {
        self.voice_profiles.insert(character.into(), voice.into());
        self
    }

    pub fn with_platform_settings(mut self, settings: PlatformSettings) -> Self {
        self.platform_settings = Some(settings);
        self
    }
}
