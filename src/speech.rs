//! Speech collaborator
//!
//! The session only decides *what* to say. This module turns expressions into
//! spoken words, derives the speech rate from user settings and provides the
//! [`Speaker`] backends that actually produce audio.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{MathProblem, UserSettings};
use crate::error::PracticeError;

/// Words per minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const MIN_RATE: f64 = 0.5;
const MAX_RATE: f64 = 2.0;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?|[+\-−×*÷/%()]|[^\s\d+\-−×*÷/%()]+").expect("valid regex"));

/// Error from a speech backend
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech backend not available: {0}")]
    Unavailable(String),

    #[error("speech failed: {0}")]
    Failed(String),
}

impl From<SpeechError> for PracticeError {
    fn from(err: SpeechError) -> Self {
        PracticeError::SpeechUnavailable(err.to_string())
    }
}

/// Spoken-word rendering of an expression (`12 × 3` -> `12 times 3`)
pub fn spoken_expression(expression: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut expect_operand = true;
    let mut pending_sign = false;

    for token in TOKEN_RE.find_iter(expression).map(|m| m.as_str()) {
        let word = match token {
            "-" | "−" if expect_operand => {
                pending_sign = true;
                continue;
            }
            "+" => "plus",
            "-" | "−" => "minus",
            "×" | "*" => "times",
            "÷" | "/" => "divided by",
            "%" => "percent",
            "(" | ")" => continue,
            number if number.starts_with(|c: char| c.is_ascii_digit()) => {
                if pending_sign {
                    words.push("negative".to_string());
                    pending_sign = false;
                }
                words.push(number.to_string());
                expect_operand = false;
                continue;
            }
            other => {
                words.push(other.to_string());
                expect_operand = true;
                continue;
            }
        };
        words.push(word.to_string());
        // A percent sign closes an operand; every other operator opens one
        expect_operand = token != "%";
    }

    words.join(" ")
}

/// Question read aloud for a problem
pub fn problem_prompt(problem: &MathProblem) -> String {
    format!("What is {}?", spoken_expression(&problem.display_expression))
}

/// Speech rate multiplier derived from settings, clamped to a usable band
pub fn speech_rate(settings: &UserSettings) -> f32 {
    let speed = if settings.voice_speed.is_finite() {
        settings.voice_speed
    } else {
        1.0
    };
    speed.clamp(MIN_RATE, MAX_RATE) as f32
}

/// Trait for speech backends
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text`, resolving once speech has finished
    async fn speak(&self, text: &str, rate: f32) -> Result<(), SpeechError>;

    /// Check if this backend can be used on this machine
    fn is_available(&self) -> bool;
}

/// Backend that speaks through a system TTS binary (`say` on macOS, `espeak` elsewhere)
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
}

impl Default for CommandSpeaker {
    fn default() -> Self {
        Self::new(default_tts_program())
    }
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn rate_args(&self, rate: f32) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * rate).round() as u32;
        let flag = if self.program.ends_with("say") { "-r" } else { "-s" };
        vec![flag.to_string(), wpm.to_string()]
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str, rate: f32) -> Result<(), SpeechError> {
        let output = tokio::process::Command::new(&self.program)
            .args(self.rate_args(rate))
            .arg(text)
            .output()
            .await
            .map_err(|e| SpeechError::Unavailable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Failed(stderr.trim().to_string()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        find_in_path(&self.program).is_some()
    }
}

/// Backend that only logs. Used when audio is off or no TTS binary exists.
#[derive(Debug, Clone, Default)]
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, text: &str, rate: f32) -> Result<(), SpeechError> {
        debug!("[mathdrill:speech] (silent, rate {:.2}) {}", rate, text);
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn default_tts_program() -> &'static str {
    if cfg!(target_os = "macos") { "say" } else { "espeak" }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}
