//! External speech synthesis and transcoding

pub mod backends;
pub mod process;
pub mod synth;
pub mod transcode;

pub use synth::{create_synth, Synthesizer};
pub use transcode::{create_transcoder, TranscodeOptions, Transcoder};
