//! picosay - say text to a call participant
//!
//! Text is synthesized with an external engine (pico2wave), transcoded to
//! signed-linear audio (sox), optionally cached by content, and handed to
//! a playback session.

pub mod cache;
pub mod config;
pub mod error;
pub mod language;
pub mod orchestrator;
pub mod playback;
pub mod request;
pub mod scratch;
pub mod speech;

pub use error::{PicoError, Result};
pub use orchestrator::SynthesisOrchestrator;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "picosay";
