//! Accessibility and audio preferences

use serde::{Deserialize, Serialize};

/// User preferences singleton.
///
/// Only `voice_feedback` and `voice_speed` influence the practice core; the
/// rest are carried for the surrounding UI and the export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub dyslexia_mode: bool,

    #[serde(default)]
    pub high_contrast: bool,

    #[serde(default)]
    pub large_text: bool,

    #[serde(default = "default_true")]
    pub sound_effects: bool,

    /// Speak correct/incorrect feedback in audio mode
    #[serde(default = "default_true")]
    pub voice_feedback: bool,

    /// Speech rate multiplier (1.0 = normal)
    #[serde(default = "default_voice_speed")]
    pub voice_speed: f64,

    #[serde(default)]
    pub dark_mode: bool,
}

fn default_true() -> bool {
    true
}

fn default_voice_speed() -> f64 {
    1.0
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            dyslexia_mode: false,
            high_contrast: false,
            large_text: false,
            sound_effects: default_true(),
            voice_feedback: default_true(),
            voice_speed: default_voice_speed(),
            dark_mode: false,
        }
    }
}
