//! SoX transcoder backend
//!
//! Runs
//! `sox -v <volume> <in.wav> -q -r <rate> -c1 -e signed-integer -b 16 -t raw <out> [effects...]`
//! producing headerless mono 16-bit signed-linear audio.

use crate::speech::process::{self, Stage};
use crate::speech::{TranscodeOptions, Transcoder};
use crate::Result;
use log::debug;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// sox invoked as a child process per request
#[derive(Debug, Clone)]
pub struct SoxTranscoder {
    /// Path or name of the sox executable
    program: String,

    /// Kill the child if it runs longer than this
    timeout: Option<Duration>,
}

impl SoxTranscoder {
    pub fn new(program: &str, timeout: Option<Duration>) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    /// Build the command line for one conversion
    fn command(&self, input: &Path, output: &Path, options: &TranscodeOptions<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-v").arg(options.volume.to_string());
        cmd.arg(input);
        cmd.arg("-q");
        cmd.arg("-r").arg(options.sample_rate.hz().to_string());
        cmd.arg("-c1");
        cmd.arg("-e").arg("signed-integer");
        cmd.arg("-b").arg("16");
        cmd.arg("-t").arg("raw");
        cmd.arg(output);
        if let Some(effects) = options.effects {
            cmd.args(effects.split_whitespace());
        }
        cmd
    }
}

impl Transcoder for SoxTranscoder {
    fn transcode(&self, input: &Path, output: &Path, options: &TranscodeOptions<'_>) -> Result<()> {
        debug!(
            "Transcoding {:?} to {} Hz at volume {}",
            input,
            options.sample_rate.hz(),
            options.volume
        );
        // A bad waveform from the synthesizer must fail here, not yield silence
        process::check_output(input, Stage::Transcode)?;
        process::run(self.command(input, output, options), self.timeout, Stage::Transcode)?;
        process::check_output(output, Stage::Transcode)
    }
}
