//! Speech synthesizer abstraction
//!
//! A synthesizer turns text into a waveform file. The pipeline only sees
//! this trait, so tests and alternative engines can stand in for pico2wave.

use crate::config::Config;
use crate::language::Language;
use crate::Result;
use log::info;
use std::path::Path;

use super::backends::pico2wave::Pico2WaveSynth;

/// Text-to-waveform stage
///
/// Implementations are shared between concurrent requests.
pub trait Synthesizer: Send + Sync {
    /// Write speech for `text` to `output` as a waveform file
    ///
    /// Must fail if no usable waveform was produced.
    fn synthesize(&self, text: &str, language: Language, output: &Path) -> Result<()>;
}

/// Create the configured synthesizer
pub fn create_synth(config: &Config) -> Box<dyn Synthesizer> {
    info!(
        "Using {} for synthesis (timeout {:?})",
        config.synth_command, config.synth_timeout
    );
    Box::new(Pico2WaveSynth::new(&config.synth_command, config.synth_timeout))
}
