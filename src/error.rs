//! Error types for picosay

use std::io;
use thiserror::Error;

/// Main error type for picosay
#[derive(Error, Debug)]
pub enum PicoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("{command} timed out after {seconds:.1}s")]
    Timeout { command: String, seconds: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

impl PicoError {
    /// True for failures of the external synthesis/transcode stages
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            PicoError::Synthesis(_) | PicoError::Transcode(_) | PicoError::Timeout { .. }
        )
    }
}

/// Result type alias for picosay operations
pub type Result<T> = std::result::Result<T, PicoError>;

impl From<String> for PicoError {
    fn from(s: String) -> Self {
        PicoError::Other(s)
    }
}

impl From<&str> for PicoError {
    fn from(s: &str) -> Self {
        PicoError::Other(s.to_string())
    }
}
