//! Benchmarks for the breakpoint envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavesynth::dsp::envelope::Envelope;

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Envelope::adsr(4800, 4800, 0.7, 14_400);
        env.prepare();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.fill(black_box(&mut buffer));
            })
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::adsr(48, 48, 0.7, 14_400);
        env.prepare();
        // Advance past attack/decay
        for _ in 0..200 {
            env.next_sample();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.fill(black_box(&mut buffer));
            })
        });

        // Release phase (ramping down)
        let mut env = Envelope::adsr(48, 48, 0.7, 4800);
        env.prepare();
        for _ in 0..200 {
            env.next_sample();
        }
        env.release();
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                env.fill(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
