//! Benchmarks for the delay line.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavesynth::dsp::delay::DelayLine;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.5f32; size];

        // Integer tap
        let mut line = DelayLine::new(48_000);
        line.set_delay(12_000).unwrap();
        group.bench_with_input(BenchmarkId::new("render", size), &size, |b, _| {
            b.iter(|| {
                line.render(black_box(&mut buffer));
            })
        });

        // Fractional tap, as a chorus would read it
        let mut line = DelayLine::new(4800);
        group.bench_with_input(BenchmarkId::new("interpolated", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    line.write(*sample);
                    *sample = line.read_interpolated(black_box(240.5 + i as f32 * 0.01));
                }
            })
        });
    }

    group.finish();
}
