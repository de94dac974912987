//! Configuration management
//!
//! Settings come from the `[general]` section of an INI file. A `Config`
//! is immutable once built; reloading produces a fresh one that is swapped
//! into a [`SharedConfig`] so in-flight requests keep the snapshot they
//! started with.

use crate::language::Language;
use crate::{PicoError, Result};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// INI section holding every recognized key
const SECTION: &str = "general";

/// Config file name under the user config directory
pub const CONFIG_FILE: &str = "picosay.conf";

pub const DEFAULT_VOLUME: f64 = 0.8;
pub const DEFAULT_SYNTH_COMMAND: &str = "pico2wave";
pub const DEFAULT_TRANSCODE_COMMAND: &str = "sox";

/// Output sample rate of the playback artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleRate {
    #[default]
    Hz8000,
    Hz16000,
}

impl SampleRate {
    /// Map a configured rate, or `None` if unsupported
    pub fn from_hz(hz: i64) -> Option<Self> {
        match hz {
            8000 => Some(SampleRate::Hz8000),
            16000 => Some(SampleRate::Hz16000),
            _ => None,
        }
    }

    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
        }
    }

    /// File extension of signed-linear audio at this rate
    pub fn extension(&self) -> &'static str {
        match self {
            SampleRate::Hz8000 => "sln",
            SampleRate::Hz16000 => "sln16",
        }
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File this config was read from, if any
    pub path: Option<PathBuf>,

    /// Output rate; unsupported values were already coerced to 8000
    pub sample_rate: SampleRate,

    /// Reuse and store synthesized audio in `cache_dir`
    pub use_cache: bool,

    pub cache_dir: PathBuf,

    /// Refresh a cache entry's mtime on every hit, for external pruning
    pub touch_cache: bool,

    /// Language used when a request names none or an unsupported one
    pub language: Language,

    /// Extra sox effect arguments, whitespace separated
    pub sox_effects: String,

    /// Linear gain applied by the transcoder
    pub volume: f64,

    /// Where scratch artifacts are created
    pub temp_dir: PathBuf,

    pub synth_timeout: Option<Duration>,
    pub transcode_timeout: Option<Duration>,

    /// Executable names for the external stages
    pub synth_command: String,
    pub transcode_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            sample_rate: SampleRate::Hz8000,
            use_cache: false,
            cache_dir: std::env::temp_dir(),
            touch_cache: false,
            language: Language::EnUs,
            sox_effects: String::new(),
            volume: DEFAULT_VOLUME,
            temp_dir: std::env::temp_dir(),
            synth_timeout: None,
            transcode_timeout: None,
            synth_command: DEFAULT_SYNTH_COMMAND.to_string(),
            transcode_command: DEFAULT_TRANSCODE_COMMAND.to_string(),
        }
    }
}

impl Config {
    /// Default config file path (~/.config/picosay/picosay.conf)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("picosay")
            .join(CONFIG_FILE)
    }

    /// Load configuration from an INI file
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(e) => PicoError::Config(format!(
                "Unable to read config file {}: {}",
                path.display(),
                e
            )),
            ini::Error::Parse(e) => PicoError::IniParse(format!("{}: {}", path.display(), e)),
        })?;

        let mut config = Self::from_ini(&ini);
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is unusable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => {
                info!("Configuration loaded from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{}. Using default settings", e);
                Self::default()
            }
        }
    }

    /// Build a config from parsed INI data
    ///
    /// Invalid individual values are logged and replaced by their default.
    pub fn from_ini(ini: &Ini) -> Self {
        let defaults = Self::default();

        let sample_rate = match get_string(ini, "samplerate") {
            None => defaults.sample_rate,
            Some(raw) => {
                let parsed = raw.trim().parse::<i64>().ok().and_then(SampleRate::from_hz);
                parsed.unwrap_or_else(|| {
                    warn!(
                        "Unsupported sample rate: {}. Falling back to {}",
                        raw,
                        defaults.sample_rate.hz()
                    );
                    defaults.sample_rate
                })
            }
        };

        let language = match get_string(ini, "language") {
            None => defaults.language,
            Some(tag) => tag.trim().parse().unwrap_or_else(|_| {
                warn!(
                    "Unsupported default language {}. Falling back to {}",
                    tag, defaults.language
                );
                defaults.language
            }),
        };

        let volume = match get_string(ini, "volume") {
            None => defaults.volume,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v > 0.0 && v.is_finite() => v,
                _ => {
                    warn!("Invalid volume {}. Falling back to {}", raw, DEFAULT_VOLUME);
                    DEFAULT_VOLUME
                }
            },
        };

        Self {
            path: None,
            sample_rate,
            use_cache: get_bool(ini, "usecache", defaults.use_cache),
            cache_dir: get_path(ini, "cachedir").unwrap_or(defaults.cache_dir),
            touch_cache: get_bool(ini, "touchcache", defaults.touch_cache),
            language,
            sox_effects: get_string(ini, "soxeffects")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.sox_effects),
            volume,
            temp_dir: get_path(ini, "tempdir").unwrap_or(defaults.temp_dir),
            synth_timeout: get_timeout(ini, "synth_timeout"),
            transcode_timeout: get_timeout(ini, "transcode_timeout"),
            synth_command: get_string(ini, "synth_command")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.synth_command),
            transcode_command: get_string(ini, "transcode_command")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.transcode_command),
        }
    }
}

/// Interpret a value the way telephony config files spell "true"
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "y" | "t" | "1" | "on"
    )
}

fn get_string<'a>(ini: &'a Ini, key: &str) -> Option<&'a str> {
    ini.get_from(Some(SECTION), key)
}

fn get_bool(ini: &Ini, key: &str, default: bool) -> bool {
    get_string(ini, key).map(parse_bool).unwrap_or(default)
}

fn get_path(ini: &Ini, key: &str) -> Option<PathBuf> {
    get_string(ini, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Seconds as a float; zero, negative or garbage disables the timeout
fn get_timeout(ini: &Ini, key: &str) -> Option<Duration> {
    let raw = get_string(ini, key)?;
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs > 0.0 && secs.is_finite() => Some(Duration::from_secs_f64(secs)),
        Ok(_) => None,
        Err(_) => {
            warn!("Invalid {} value {}. No timeout will be applied", key, raw);
            None
        }
    }
}

/// Reloadable handle to the active configuration
#[derive(Debug)]
pub struct SharedConfig {
    current: RwLock<Arc<Config>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Snapshot of the active configuration
    pub fn current(&self) -> Arc<Config> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the active configuration
    pub fn replace(&self, config: Config) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(config);
    }

    /// Re-read `path` and swap the result in
    pub fn reload(&self, path: &Path) -> Arc<Config> {
        info!("Reloading configuration from {:?}", path);
        self.replace(Config::load_or_default(path));
        self.current()
    }
}
