//! Benchmarks for the parameter smoothers.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavesynth::dsp::smoother::{OnePoleSmoother, Smoother, Smoothing};

use crate::BLOCK_SIZES;

pub fn bench_smoother(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/smoother");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![1.0f32; size];

        // Linear ramp, retargeted every block
        let mut ramp = Smoother::new(480, 0.0);
        let mut target = 0.0f32;
        group.bench_with_input(BenchmarkId::new("ramp", size), &size, |b, _| {
            b.iter(|| {
                target = 1.0 - target;
                ramp.set_value(target);
                ramp.multiply(black_box(&mut buffer));
            })
        });

        // Exponential approach
        let mut one_pole = OnePoleSmoother::new(480, 0.0);
        group.bench_with_input(BenchmarkId::new("one_pole", size), &size, |b, _| {
            b.iter(|| {
                target = 1.0 - target;
                one_pole.set_value(target);
                one_pole.fill(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
