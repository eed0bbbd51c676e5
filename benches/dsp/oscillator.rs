//! Benchmarks for unison wavetable playback.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use wavesynth::dsp::oscillator::Oscillator;

use super::sawtooth_table;
use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let table = sawtooth_table();
    let frequency = 440.0 / 48_000.0;

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Single voice - one table lookup per sample
        let mut osc = Oscillator::new().with_wavetable(table.clone());
        osc.set_frequency(frequency);
        group.bench_with_input(BenchmarkId::new("single", size), &size, |b, _| {
            b.iter(|| {
                osc.fill(black_box(&mut buffer));
            })
        });

        // Full unison - ten lookups per sample
        let mut osc = Oscillator::new().with_wavetable(table.clone());
        osc.set_frequency(frequency);
        osc.set_unison_number(wavesynth::MAX_UNISON).unwrap();
        osc.set_unison_spread(0.5);
        group.bench_with_input(BenchmarkId::new("unison_10", size), &size, |b, _| {
            b.iter(|| {
                osc.fill(black_box(&mut buffer));
            })
        });

        // Full unison with detune noise - adds a PRNG call per voice
        let mut osc = Oscillator::new().with_wavetable(table.clone());
        osc.set_frequency(frequency);
        osc.set_unison_number(wavesynth::MAX_UNISON).unwrap();
        osc.set_unison_spread(0.5);
        osc.set_unison_noise(0.5);
        group.bench_with_input(BenchmarkId::new("unison_10_noise", size), &size, |b, _| {
            b.iter(|| {
                osc.fill(black_box(&mut buffer));
            })
        });

        // Per-sample frequency buffer
        let mut osc = Oscillator::new().with_wavetable(table.clone());
        let frequencies: Vec<f32> = (0..size)
            .map(|i| frequency * (1.0 + 0.01 * (i as f32 / size as f32)))
            .collect();
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, _| {
            b.iter(|| {
                osc.fill_modulated(black_box(&mut buffer), black_box(&frequencies));
            })
        });
    }

    group.finish();
}
