//! Init command implementation

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use mathdrill::config::Config;

/// Default configuration content for mathdrill init
pub const DEFAULT_CONFIG: &str = r#"# mathdrill configuration
# =======================
#
# Every key is optional; missing keys fall back to the values shown here.

# ============================================================================
# PRACTICE - Defaults for `mathdrill practice` when flags are omitted
# ============================================================================
#
#   operation   - addition, subtraction, multiplication, division, percentage
#   difficulty  - beginner, intermediate, advanced, expert
#   mode        - timed, accuracy, audio
#   time_limit  - seconds, timed mode only

[practice]
operation = "addition"
difficulty = "beginner"
mode = "accuracy"
session_length = 10
time_limit = 60
include_decimals = false
include_negatives = false
multi_step = false
mixed_operations = false

# ============================================================================
# SESSION - Pacing of automatic transitions (milliseconds)
# ============================================================================

[session]
# How long feedback stays up before the next problem
advance_delay_ms = 1500
# Same, in audio mode, so spoken feedback can finish
audio_advance_delay_ms = 2000
# Pause before a problem is read aloud
dictation_delay_ms = 500

# ============================================================================
# SERVER - `mathdrill serve`
# ============================================================================

[server]
bind = "127.0.0.1"
port = 3001

# ============================================================================
# AUDIO / STORAGE
# ============================================================================

[audio]
# TTS binary; defaults to `say` on macOS and `espeak` elsewhere
# speech_command = "espeak-ng"

[storage]
# Defaults to ~/.mathdrill/progress.db
# database_path = "/path/to/progress.db"
"#;

/// Write the commented default config
pub fn init_command(config_override: Option<&Path>, force: bool) -> Result<()> {
    let config_path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::global_config_path);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!("[mathdrill:config] Wrote {}", config_path.display());
    println!("Created {}", config_path.display());
    Ok(())
}
