//! Requests and application argument parsing
//!
//! The application is invoked with a single argument string of the form
//! `text[,interrupt[,language]]`. Commas inside double quotes or inside
//! parentheses do not split, double quotes are dropped, and a backslash
//! escapes the following character.

use crate::config::{Config, SampleRate};
use crate::language::Language;
use crate::{PicoError, Result};
use log::{debug, warn};

/// Remove one pair of surrounding double quotes (and outer whitespace)
pub fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Keys that may cut playback short
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InterruptSpec {
    /// Playback cannot be interrupted
    #[default]
    None,
    /// Any DTMF key interrupts
    Any,
    /// Only the listed keys interrupt
    Digits(String),
}

impl InterruptSpec {
    /// Parse the interrupt argument: empty, `any`, or a set of DTMF keys
    /// (`0-9`, `*`, `#`, `A-D` in either case)
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = strip_quotes(raw);
        if raw.is_empty() {
            return Ok(InterruptSpec::None);
        }
        if raw.eq_ignore_ascii_case("any") {
            return Ok(InterruptSpec::Any);
        }
        if let Some(bad) = raw.chars().find(|c| !is_dtmf(*c)) {
            return Err(PicoError::Validation(format!(
                "invalid interrupt key '{}' in '{}'",
                bad, raw
            )));
        }
        Ok(InterruptSpec::Digits(raw.to_string()))
    }

    /// Does this key stop playback?
    pub fn accepts(&self, key: char) -> bool {
        match self {
            InterruptSpec::None => false,
            InterruptSpec::Any => is_dtmf(key),
            InterruptSpec::Digits(digits) => {
                is_dtmf(key) && digits.chars().any(|d| d.eq_ignore_ascii_case(&key))
            }
        }
    }
}

fn is_dtmf(c: char) -> bool {
    c.is_ascii_digit() || matches!(c.to_ascii_uppercase(), '*' | '#' | 'A'..='D')
}

/// Parsed application arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppArgs {
    pub text: String,
    pub interrupt: InterruptSpec,
    pub language: Option<String>,
}

impl AppArgs {
    /// Parse `text[,interrupt[,language]]`
    ///
    /// Only a missing argument string is an error. An interrupt field that
    /// is not a valid key set is logged and playback is left uninterruptible.
    pub fn parse(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Err(PicoError::Validation(
                "an argument (text) is required".to_string(),
            ));
        }

        let mut fields = split_args(data).into_iter();
        let text = fields.next().unwrap_or_default();
        let interrupt = match fields.next() {
            Some(raw) => InterruptSpec::parse(&raw).unwrap_or_else(|e| {
                warn!("{}, playback will not be interruptible", e);
                InterruptSpec::None
            }),
            None => InterruptSpec::None,
        };
        let language = fields
            .next()
            .map(|raw| strip_quotes(&raw).to_string())
            .filter(|s| !s.is_empty());

        let rest: Vec<String> = fields.collect();
        if !rest.is_empty() {
            warn!("Ignoring {} extra argument(s)", rest.len());
        }

        Ok(Self {
            text: strip_quotes(&text).to_string(),
            interrupt,
            language,
        })
    }
}

/// Split on commas outside quotes and parentheses
///
/// Double quotes only toggle quoting and are dropped. A backslash is dropped
/// and the character after it is taken literally.
fn split_args(data: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut depth = 0usize;
    let mut chars = data.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => in_quotes = !in_quotes,
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if !in_quotes && depth == 0 => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// A validated "speak this text" request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Text to speak, quotes already stripped
    pub text: String,
    pub language: Language,
    pub sample_rate: SampleRate,
    pub volume: f64,
    /// Extra transcoder effects, if any
    pub effects: Option<String>,
}

impl SynthesisRequest {
    /// Build a request using the rate, volume and effects from `config`
    ///
    /// Fails with a validation error when no text remains after quote
    /// stripping. An unsupported language is replaced by the configured
    /// default.
    pub fn new(text: &str, language: Option<&str>, config: &Config) -> Result<Self> {
        let text = strip_quotes(text);
        if text.is_empty() {
            return Err(PicoError::Validation(
                "no text passed for synthesis".to_string(),
            ));
        }

        let language = Language::resolve(language, config.language);
        let effects = Some(config.sox_effects.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        debug!(
            "Request: text={:?} voice={} rate={} volume={}",
            text,
            language,
            config.sample_rate.hz(),
            config.volume
        );

        Ok(Self {
            text: text.to_string(),
            language,
            sample_rate: config.sample_rate,
            volume: config.volume,
            effects,
        })
    }

    /// Build a request from parsed application arguments
    pub fn from_args(args: &AppArgs, config: &Config) -> Result<Self> {
        Self::new(&args.text, args.language.as_deref(), config)
    }
}
