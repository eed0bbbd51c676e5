//! Band-limited wavetable synthesis.
//!
//! Waves are sampled and band-limited off the audio thread (see [`engine`]),
//! then played back by the allocation-free primitives in [`dsp`].

pub mod config;
pub mod dsp;
pub mod engine; // Background recomputation and worker pools
pub mod error;
pub mod synth; // A playable voice built from the primitives
pub mod wavetable;

pub use config::SynthConfig;
pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
/// Smallest period length accepted by the spectrum filler.
pub const MIN_TABLE_SIZE: usize = 4096;
/// Maximum number of unison voices per oscillator.
pub const MAX_UNISON: usize = 10;
