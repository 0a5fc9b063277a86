//! Settings command implementation

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use mathdrill::domain::UserSettings;

use super::AppContext;

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings (default)
    Show,

    /// Change one setting, e.g. `voice-speed 1.25` or `dark-mode true`
    Set {
        key: String,
        value: String,
    },

    /// Restore the default settings
    Reset,
}

pub fn settings_command(ctx: &AppContext, action: Option<SettingsAction>) -> Result<()> {
    let store = ctx.open_store()?;
    let mut settings = store.query().settings()?;

    match action.unwrap_or(SettingsAction::Show) {
        SettingsAction::Show => {}
        SettingsAction::Set { key, value } => {
            apply_setting(&mut settings, &key, &value)?;
            store.recorder().save_settings(&settings)?;
        }
        SettingsAction::Reset => {
            settings = UserSettings::default();
            store.recorder().save_settings(&settings)?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// Update one field by its kebab-, snake- or camelCase name
fn apply_setting(settings: &mut UserSettings, key: &str, value: &str) -> Result<()> {
    let normalized = key.replace(['-', '_'], "").to_lowercase();
    let flag = || -> Result<bool> {
        value
            .parse::<bool>()
            .with_context(|| format!("{} expects true or false, got '{}'", key, value))
    };

    match normalized.as_str() {
        "dyslexiamode" => settings.dyslexia_mode = flag()?,
        "highcontrast" => settings.high_contrast = flag()?,
        "largetext" => settings.large_text = flag()?,
        "soundeffects" => settings.sound_effects = flag()?,
        "voicefeedback" => settings.voice_feedback = flag()?,
        "darkmode" => settings.dark_mode = flag()?,
        "voicespeed" => {
            let speed: f64 = value
                .parse()
                .with_context(|| format!("voice-speed expects a number, got '{}'", value))?;
            if !speed.is_finite() || speed <= 0.0 {
                bail!("voice-speed must be a positive number");
            }
            settings.voice_speed = speed;
        }
        _ => bail!("Unknown setting '{}'", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_setting_accepts_any_case() {
        let mut settings = UserSettings::default();
        apply_setting(&mut settings, "voice-speed", "1.5").unwrap();
        apply_setting(&mut settings, "darkMode", "true").unwrap();
        apply_setting(&mut settings, "voice_feedback", "false").unwrap();
        assert_eq!(settings.voice_speed, 1.5);
        assert!(settings.dark_mode);
        assert!(!settings.voice_feedback);
    }

    #[test]
    fn test_apply_setting_rejects_bad_input() {
        let mut settings = UserSettings::default();
        assert!(apply_setting(&mut settings, "volume", "3").is_err());
        assert!(apply_setting(&mut settings, "dark-mode", "maybe").is_err());
        assert!(apply_setting(&mut settings, "voice-speed", "0").is_err());
        assert_eq!(settings, UserSettings::default());
    }
}
