//! Benchmarks for band-limited table generation (background thread work).

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavesynth::{
    dsp::wave::Wave,
    wavetable::{SpectrumFiller, SpectrumPlanner, Wavetable},
};

pub fn bench_spectrum(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/spectrum");
    group.sample_size(20);

    let waves = [
        ("sawtooth", Wave::sawtooth()),
        (
            "harmonics_16",
            Wave::sine().with_harmonics(&[1.0; 16]),
        ),
    ];

    for &size in &[4096usize, 16_384] {
        for (name, wave) in &waves {
            let mut filler = SpectrumFiller::new(SpectrumPlanner::new());
            let mut wavetable = Wavetable::default();
            group.bench_with_input(BenchmarkId::new(*name, size), &size, |b, &size| {
                b.iter(|| {
                    filler
                        .fill(black_box(wave), &mut wavetable, size)
                        .unwrap();
                })
            });
        }
    }

    group.finish();
}
