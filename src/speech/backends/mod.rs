//! External command backends

// SVOX Pico synthesizer (pico2wave)
pub mod pico2wave;

// SoX transcoder
pub mod sox;
