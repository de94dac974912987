//! Transcoder abstraction
//!
//! Converts a synthesized waveform into headerless mono signed-linear audio
//! at the playback rate, applying gain and optional effects on the way.

use crate::config::{Config, SampleRate};
use crate::request::SynthesisRequest;
use crate::Result;
use log::info;
use std::path::Path;

use super::backends::sox::SoxTranscoder;

/// Parameters of one transcode run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscodeOptions<'a> {
    pub sample_rate: SampleRate,
    pub volume: f64,
    /// Whitespace separated effect chain, passed after the output file
    pub effects: Option<&'a str>,
}

impl<'a> TranscodeOptions<'a> {
    pub fn for_request(request: &'a SynthesisRequest) -> Self {
        Self {
            sample_rate: request.sample_rate,
            volume: request.volume,
            effects: request.effects.as_deref(),
        }
    }
}

/// Waveform-to-playback stage
pub trait Transcoder: Send + Sync {
    /// Convert `input` into playback-ready audio at `output`
    fn transcode(&self, input: &Path, output: &Path, options: &TranscodeOptions<'_>) -> Result<()>;
}

/// Create the configured transcoder
pub fn create_transcoder(config: &Config) -> Box<dyn Transcoder> {
    info!(
        "Using {} for transcoding (timeout {:?})",
        config.transcode_command, config.transcode_timeout
    );
    Box::new(SoxTranscoder::new(
        &config.transcode_command,
        config.transcode_timeout,
    ))
}
