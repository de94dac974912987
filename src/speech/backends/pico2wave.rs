//! pico2wave synthesizer backend
//!
//! Runs `pico2wave -w <out.wav> -l <lang> -- <text>`. The text is a single
//! argument vector entry, so quotes and shell metacharacters in it are
//! spoken, never executed.
//!
//! Dependencies:
//! - libttspico-utils (install with: sudo apt install libttspico-utils)

use crate::language::Language;
use crate::speech::process::{self, Stage};
use crate::speech::Synthesizer;
use crate::Result;
use log::debug;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// pico2wave invoked as a child process per request
#[derive(Debug, Clone)]
pub struct Pico2WaveSynth {
    /// Path or name of the pico2wave executable
    program: String,

    /// Kill the child if it runs longer than this
    timeout: Option<Duration>,
}

impl Pico2WaveSynth {
    pub fn new(program: &str, timeout: Option<Duration>) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    /// Build the command line for one synthesis
    fn command(&self, text: &str, language: Language, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-w").arg(output);
        cmd.arg("-l").arg(language.as_str());
        cmd.arg("--").arg(text);
        cmd
    }
}

impl Synthesizer for Pico2WaveSynth {
    fn synthesize(&self, text: &str, language: Language, output: &Path) -> Result<()> {
        debug!("Synthesizing {} chars as {}", text.len(), language);
        process::run(self.command(text, language, output), self.timeout, Stage::Synthesis)?;
        process::check_output(output, Stage::Synthesis)
    }
}
