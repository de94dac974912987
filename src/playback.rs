//! Playback artifacts and the session that plays them
//!
//! The telephony side (answering a channel, streaming audio to it, waiting
//! for DTMF) lives outside this crate and is reached through
//! [`PlaybackSession`].

use crate::cache::CacheEntry;
use crate::request::InterruptSpec;
use crate::scratch::ScratchFile;
use crate::{PicoError, Result};
use log::debug;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Audio ready to be streamed
///
/// Scratch artifacts are deleted when this value is dropped, so hold it
/// until playback has finished.
#[derive(Debug)]
pub enum PlaybackArtifact {
    /// A cache file; `fresh` is set when this request just published it
    Cached { entry: CacheEntry, fresh: bool },
    /// Freshly synthesized audio that was not cached
    Scratch {
        file: ScratchFile,
        extension: &'static str,
    },
}

impl PlaybackArtifact {
    pub fn path(&self) -> &Path {
        match self {
            PlaybackArtifact::Cached { entry, .. } => entry.path.as_path(),
            PlaybackArtifact::Scratch { file, .. } => file.path(),
        }
    }

    /// Format tag (`sln` or `sln16`)
    pub fn extension(&self) -> &'static str {
        match self {
            PlaybackArtifact::Cached { entry, .. } => entry.extension,
            PlaybackArtifact::Scratch { extension, .. } => *extension,
        }
    }

    /// Served from the cache without running the pipeline
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, PlaybackArtifact::Cached { fresh: false, .. })
    }

    pub fn cache_entry(&self) -> Option<&CacheEntry> {
        match self {
            PlaybackArtifact::Cached { entry, .. } => Some(entry),
            PlaybackArtifact::Scratch { .. } => None,
        }
    }
}

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Played to the end
    Completed,
    /// Stopped early by this key
    Interrupted(char),
    /// Nothing to say; no audio was played
    Skipped,
}

/// The call-side collaborator
pub trait PlaybackSession {
    /// Answer the session if it is not up yet
    fn ensure_answered(&mut self) -> Result<()>;

    /// Stream `artifact` to the participant, stopping on an accepted key
    fn stream(&mut self, artifact: &PlaybackArtifact, interrupt: &InterruptSpec) -> Result<PlaybackOutcome>;
}

/// Where a [`FileExportSession`] writes audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Stdout,
    File(PathBuf),
}

/// Session that "plays" audio by writing its raw bytes out
///
/// Used by the command-line tool; there is no far end to answer and no
/// keys can interrupt.
#[derive(Debug)]
pub struct FileExportSession {
    target: ExportTarget,
    answered: bool,
}

impl FileExportSession {
    pub fn new(target: ExportTarget) -> Self {
        Self {
            target,
            answered: false,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    fn copy_to(&self, artifact: &PlaybackArtifact, out: &mut dyn Write) -> io::Result<u64> {
        let mut input = File::open(artifact.path())?;
        let n = io::copy(&mut input, out)?;
        out.flush()?;
        Ok(n)
    }
}

impl PlaybackSession for FileExportSession {
    fn ensure_answered(&mut self) -> Result<()> {
        self.answered = true;
        Ok(())
    }

    fn stream(&mut self, artifact: &PlaybackArtifact, _interrupt: &InterruptSpec) -> Result<PlaybackOutcome> {
        let written = match &self.target {
            ExportTarget::Stdout => self.copy_to(artifact, &mut io::stdout().lock()),
            ExportTarget::File(path) => {
                File::create(path).and_then(|mut file| self.copy_to(artifact, &mut file))
            }
        }
        .map_err(|e| {
            PicoError::Playback(format!(
                "streaming {} failed: {}",
                artifact.path().display(),
                e
            ))
        })?;

        debug!("Streamed {} bytes from {:?}", written, artifact.path());
        Ok(PlaybackOutcome::Completed)
    }
}
