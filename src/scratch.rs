//! Scratch files for intermediate pipeline artifacts
//!
//! Every path handed out is unique among live requests: it combines the
//! process id with a process-wide counter. A [`ScratchFile`] deletes its
//! file when dropped, so cleanup happens on every exit path.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence for scratch names
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// What a scratch file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchKind {
    /// Waveform straight from the synthesizer
    RawSynth,
    /// Playback-ready raw audio
    Transcoded,
}

/// Allocates and releases scratch paths under one directory
#[derive(Debug, Clone)]
pub struct TempResourceManager {
    dir: PathBuf,
}

impl TempResourceManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Produce a fresh path `{dir}/{prefix}{pid}_{seq}{suffix}`
    ///
    /// Nothing is created on disk.
    pub fn allocate(&self, prefix: &str, suffix: &str) -> PathBuf {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}_{}{}", prefix, std::process::id(), seq, suffix);
        self.dir.join(name)
    }

    /// Allocate a path wrapped in a guard that deletes it on drop
    pub fn scratch(&self, prefix: &str, suffix: &str, kind: ScratchKind) -> ScratchFile {
        ScratchFile {
            path: self.allocate(prefix, suffix),
            kind,
            released: false,
        }
    }

    /// Best-effort delete; failures are only logged
    pub fn release(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!("Released scratch file {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {:?}: {}", path, e),
        }
    }
}

/// A scratch path owned by one request
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    kind: ScratchKind,
    released: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ScratchKind {
        self.kind
    }

    /// Delete the file now rather than at drop
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            TempResourceManager::release(&self.path);
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocate_unique() {
        let manager = TempResourceManager::new("/tmp");
        let paths: HashSet<PathBuf> = (0..100).map(|_| manager.allocate("picotts_", ".wav")).collect();
        assert_eq!(paths.len(), 100);
    }

    #[test]
    fn test_allocate_shape() {
        let manager = TempResourceManager::new("/scratch");
        let path = manager.allocate("picotts_", ".sln16");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with("/scratch"));
        assert!(name.starts_with("picotts_"));
        assert!(name.ends_with(".sln16"));
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempResourceManager::new(dir.path());

        let scratch = manager.scratch("t_", ".wav", ScratchKind::RawSynth);
        let path = scratch.path().to_path_buf();
        fs::write(&path, b"data").unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_release_missing_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempResourceManager::new(dir.path());
        let scratch = manager.scratch("t_", ".sln", ScratchKind::Transcoded);
        assert_eq!(scratch.kind(), ScratchKind::Transcoded);
        // never written; release must not panic
        scratch.release();
    }
}
