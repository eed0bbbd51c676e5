//! Work that must stay off the audio thread.
//!
//! [`WaveComputer`] rebuilds a wavetable in the background and publishes it
//! to realtime readers; [`WorkPerformer`] is a small thread pool for any
//! other expensive job.

pub mod computer;
pub mod performer;

pub use computer::{ComputeListener, WaveComputer, WavetableReader};
pub use performer::{Unit, Work, WorkPerformer};
