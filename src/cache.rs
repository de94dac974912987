//! Content-addressed store of synthesized audio
//!
//! Entries live at `{cachedir}/{md5 hex}.{ext}` where `ext` encodes the
//! sample rate. There is no index; the file's existence is the entry.
//!
//! The key covers the request text only. Asking for the same text with a
//! different language, rate or volume returns whatever was cached first.
//! Callers that need per-voice entries should fold those parameters into
//! the text they key on, see [`CacheKey::from_parts`].

use crate::config::SampleRate;
use crate::scratch::TempResourceManager;
use crate::{PicoError, Result};
use log::{debug, warn};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Upper bound on a cache path, in bytes
pub const MAX_PATH_LEN: usize = 2048;

/// Room reserved for separator, dot, the longest extension and a terminator
const PATH_OVERHEAD: usize = 8;

/// Hex-encoded 128-bit digest of the request text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Length of the hex digest
    pub const LEN: usize = 32;

    /// Digest of `text` exactly as given
    pub fn from_text(text: &str) -> Self {
        Self(format!("{:x}", md5::compute(text.as_bytes())))
    }

    /// Digest over several parts, for callers that want voice-aware keys
    pub fn from_parts(parts: &[&str]) -> Self {
        let mut ctx = md5::Context::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                ctx.consume([0u8]);
            }
            ctx.consume(part.as_bytes());
        }
        Self(format!("{:x}", ctx.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A published cache file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub path: PathBuf,
    pub extension: &'static str,
}

/// Cache directory accessor
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Does a path for `key` stay within [`MAX_PATH_LEN`]?
    pub fn fits(&self, key: &CacheKey) -> bool {
        self.dir.as_os_str().len() + key.as_str().len() + PATH_OVERHEAD <= MAX_PATH_LEN
    }

    /// Canonical location of an entry
    pub fn path(&self, key: &CacheKey, rate: SampleRate) -> PathBuf {
        self.dir.join(format!("{}.{}", key, rate.extension()))
    }

    pub fn entry(&self, key: &CacheKey, rate: SampleRate) -> CacheEntry {
        CacheEntry {
            key: key.clone(),
            path: self.path(key, rate),
            extension: rate.extension(),
        }
    }

    /// True iff the entry file exists
    pub fn exists(&self, key: &CacheKey, rate: SampleRate) -> bool {
        self.path(key, rate).is_file()
    }

    /// Look up an entry, if present
    pub fn lookup(&self, key: &CacheKey, rate: SampleRate) -> Option<CacheEntry> {
        let entry = self.entry(key, rate);
        if entry.path.is_file() {
            Some(entry)
        } else {
            None
        }
    }

    /// Read an entry's bytes
    pub fn read(&self, key: &CacheKey, rate: SampleRate) -> Result<Vec<u8>> {
        let path = self.path(key, rate);
        fs::read(&path)
            .map_err(|e| PicoError::CacheIo(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Set the entry's modification time to now
    pub fn touch(&self, key: &CacheKey, rate: SampleRate) -> Result<()> {
        let path = self.path(key, rate);
        let touch = || -> io::Result<()> {
            let file = File::options().write(true).open(&path)?;
            file.set_modified(SystemTime::now())
        };
        touch().map_err(|e| PicoError::CacheIo(format!("Failed to touch {}: {}", path.display(), e)))?;
        debug!("Touched cache file {:?}", path);
        Ok(())
    }

    /// Copy `source` into the cache under `key`
    ///
    /// The data is written to a hidden temporary file in the cache directory
    /// and renamed over the final name, so readers see either no entry or a
    /// complete one. With concurrent publishers the last rename wins.
    pub fn publish(&self, source: &Path, key: &CacheKey, rate: SampleRate) -> Result<CacheEntry> {
        let entry = self.entry(key, rate);
        let staging = TempResourceManager::new(&self.dir).allocate(&format!(".{}.", key), ".tmp");

        let write = || -> io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            fs::copy(source, &staging)?;
            File::open(&staging)?.sync_all()?;
            fs::rename(&staging, &entry.path)
        };

        if let Err(e) = write() {
            TempResourceManager::release(&staging);
            return Err(PicoError::CacheIo(format!(
                "Failed to publish {}: {}",
                entry.path.display(),
                e
            )));
        }

        debug!("Saved cache file {:?}", entry.path);
        Ok(entry)
    }

    /// Publish, logging instead of failing
    pub fn try_publish(&self, source: &Path, key: &CacheKey, rate: SampleRate) -> Option<CacheEntry> {
        match self.publish(source, key, rate) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}
