//! Synthesis pipeline with cache reuse
//!
//! One request runs `cache check -> synthesize -> transcode -> publish`
//! sequentially. Requests share nothing but the cache directory, so any
//! number may run at once on separate threads. Two concurrent misses on
//! the same text both do the work; the atomic publish means the cache ends
//! up with one complete entry either way.

use crate::cache::{CacheKey, CacheStore};
use crate::config::{Config, SharedConfig};
use crate::playback::{PlaybackArtifact, PlaybackOutcome, PlaybackSession};
use crate::request::{AppArgs, InterruptSpec, SynthesisRequest};
use crate::scratch::{ScratchKind, TempResourceManager};
use crate::speech::{create_synth, create_transcoder, Synthesizer, TranscodeOptions, Transcoder};
use crate::{PicoError, Result};
use log::{debug, info, warn};
use std::sync::Arc;

/// Prefix of every scratch file
const SCRATCH_PREFIX: &str = "picotts_";

/// Where the synthesis and transcode stages come from
enum Stages {
    /// Built from each request's config, so command and timeout changes apply
    FromConfig,
    Fixed {
        synth: Box<dyn Synthesizer>,
        transcoder: Box<dyn Transcoder>,
    },
}

/// Turns requests into playable audio
///
/// Every request reads the shared configuration once when it starts and
/// uses that snapshot throughout, so a reload only affects later requests.
pub struct SynthesisOrchestrator {
    shared: Arc<SharedConfig>,
    stages: Stages,
}

impl SynthesisOrchestrator {
    /// Orchestrator using the external commands named in the configuration
    pub fn new(shared: Arc<SharedConfig>) -> Self {
        Self::log_ready(&shared.current());
        Self {
            shared,
            stages: Stages::FromConfig,
        }
    }

    /// Orchestrator with explicit synthesis and transcode stages
    pub fn with_components(
        shared: Arc<SharedConfig>,
        synth: Box<dyn Synthesizer>,
        transcoder: Box<dyn Transcoder>,
    ) -> Self {
        Self::log_ready(&shared.current());
        Self {
            shared,
            stages: Stages::Fixed { synth, transcoder },
        }
    }

    fn log_ready(config: &Config) {
        info!(
            "Orchestrator ready: cache {} at {:?}, rate {}",
            if config.use_cache { "enabled" } else { "disabled" },
            config.cache_dir,
            config.sample_rate.hz()
        );
    }

    /// The configuration the next request will use
    pub fn config(&self) -> Arc<Config> {
        self.shared.current()
    }

    pub fn shared_config(&self) -> &Arc<SharedConfig> {
        &self.shared
    }

    /// Cache store for the current configuration
    pub fn cache(&self) -> CacheStore {
        CacheStore::new(&self.shared.current().cache_dir)
    }

    /// Produce playable audio for `request`
    ///
    /// Returns the cache entry on a hit. On a miss the synthesizer and
    /// transcoder run; a failure of either fails the request. A failed
    /// cache write is logged and the fresh audio is returned anyway. All
    /// scratch files are gone on return except the one inside a returned
    /// [`PlaybackArtifact::Scratch`], which goes when that is dropped.
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<PlaybackArtifact> {
        let config = self.shared.current();
        self.synthesize_with(&config, request)
    }

    fn synthesize_with(&self, config: &Config, request: &SynthesisRequest) -> Result<PlaybackArtifact> {
        let cache = CacheStore::new(&config.cache_dir);
        let scratch = TempResourceManager::new(&config.temp_dir);
        let rate = request.sample_rate;
        let key = CacheKey::from_text(&request.text);
        let use_cache = config.use_cache && cache_fits(&cache, &key);

        if use_cache {
            debug!("Activating cache mechanism for {}", key);
            if let Some(entry) = cache.lookup(&key, rate) {
                debug!("Cache file exists: {:?}", entry.path);
                if config.touch_cache {
                    if let Err(e) = cache.touch(&key, rate) {
                        warn!("{}", e);
                    }
                }
                return Ok(PlaybackArtifact::Cached { entry, fresh: false });
            }
            debug!("Cache file does not yet exist");
        }

        let built;
        let (synth, transcoder): (&dyn Synthesizer, &dyn Transcoder) = match &self.stages {
            Stages::Fixed { synth, transcoder } => (synth.as_ref(), transcoder.as_ref()),
            Stages::FromConfig => {
                built = (create_synth(config), create_transcoder(config));
                (built.0.as_ref(), built.1.as_ref())
            }
        };

        let raw = scratch.scratch(SCRATCH_PREFIX, ".wav", ScratchKind::RawSynth);
        let out = scratch.scratch(
            SCRATCH_PREFIX,
            &format!(".{}", rate.extension()),
            ScratchKind::Transcoded,
        );

        synth
            .synthesize(&request.text, request.language, raw.path())
            .map_err(|e| {
                warn!("Synthesis failed: {}", e);
                e
            })?;

        let transcoded =
            transcoder.transcode(raw.path(), out.path(), &TranscodeOptions::for_request(request));
        raw.release();
        transcoded.map_err(|e| {
            warn!("Transcode failed: {}", e);
            e
        })?;

        if use_cache {
            if let Some(entry) = cache.try_publish(out.path(), &key, rate) {
                out.release();
                return Ok(PlaybackArtifact::Cached { entry, fresh: true });
            }
        }

        Ok(PlaybackArtifact::Scratch {
            file: out,
            extension: rate.extension(),
        })
    }

    /// Synthesize `request` and play it through `session` once
    pub fn say(
        &self,
        session: &mut dyn PlaybackSession,
        request: &SynthesisRequest,
        interrupt: &InterruptSpec,
    ) -> Result<PlaybackOutcome> {
        let config = self.shared.current();
        self.say_with(&config, session, request, interrupt)
    }

    fn say_with(
        &self,
        config: &Config,
        session: &mut dyn PlaybackSession,
        request: &SynthesisRequest,
        interrupt: &InterruptSpec,
    ) -> Result<PlaybackOutcome> {
        let artifact = self.synthesize_with(config, request)?;
        session.ensure_answered()?;
        let outcome = session.stream(&artifact, interrupt);
        drop(artifact);
        outcome
    }

    /// Handle a raw application invocation `text[,interrupt[,language]]`
    ///
    /// Text that is empty after quote stripping is a no-op and yields
    /// [`PlaybackOutcome::Skipped`].
    pub fn exec(&self, session: &mut dyn PlaybackSession, data: &str) -> Result<PlaybackOutcome> {
        let config = self.shared.current();
        let args = AppArgs::parse(data)?;
        let request = match SynthesisRequest::from_args(&args, &config) {
            Ok(request) => request,
            Err(PicoError::Validation(msg)) => {
                warn!("{}", msg);
                return Ok(PlaybackOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };
        self.say_with(&config, session, &request, &args.interrupt)
    }
}

fn cache_fits(cache: &CacheStore, key: &CacheKey) -> bool {
    let fits = cache.fits(key);
    if !fits {
        warn!(
            "Cache path under {:?} too long, not caching this request",
            cache.dir()
        );
    }
    fits
}
