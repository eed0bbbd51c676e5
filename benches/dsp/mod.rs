//! Benchmarks for low-level DSP primitives.

mod delay;
mod envelope;
mod oscillator;
mod smoother;
mod spectrum;

pub use delay::bench_delay;
pub use envelope::bench_envelope;
pub use oscillator::bench_oscillator;
pub use smoother::bench_smoother;
pub use spectrum::bench_spectrum;

use std::sync::Arc;

use wavesynth::{
    dsp::wave::Wave,
    wavetable::{SpectrumFiller, SpectrumPlanner, Wavetable},
};

/// A filled sawtooth wavetable at the minimum table size.
pub fn sawtooth_table() -> Arc<Wavetable> {
    let mut wavetable = Wavetable::default();
    SpectrumFiller::new(SpectrumPlanner::new())
        .fill(&Wave::sawtooth(), &mut wavetable, wavesynth::MIN_TABLE_SIZE)
        .expect("table size is valid");
    Arc::new(wavetable)
}
