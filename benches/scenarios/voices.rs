//! Benchmarks for complete voices.

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion};
use wavesynth::{
    dsp::{envelope::Envelope, wave::Wave},
    engine::WaveComputer,
    synth::{SynthMessage, Voice},
    SynthConfig,
};

use crate::dsp::sawtooth_table;
use crate::BLOCK_SIZES;

fn note_on(voice: &mut Voice) {
    voice.handle_message(SynthMessage::NoteOn {
        frequency: 110.0, // A2, typical bass note
        velocity: 1.0,
    });
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let table = sawtooth_table();
    let envelope = Envelope::adsr(480, 4800, 0.7, 9600);

    // Live source: a running computer with one published table
    let config = SynthConfig::default();
    let (published, generations) = crossbeam::channel::unbounded();
    let computer = WaveComputer::new(&config, published).unwrap();
    computer.update(Wave::sine().with_harmonics(&[1.0, 0.5, 0.33, 0.25]));
    generations
        .recv_timeout(Duration::from_secs(10))
        .expect("wave computer publishes");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === PLAIN VOICE ===
        // One oscillator voice, fixed table
        let mut lead = Voice::new(&config, table.clone(), envelope.clone()).unwrap();
        note_on(&mut lead);
        group.bench_with_input(BenchmarkId::new("lead", size), &size, |b, _| {
            b.iter(|| {
                lead.render(black_box(&mut buffer));
            })
        });

        // === SUPERSAW ===
        // Seven detuned voices with a little drift
        let supersaw_config = config.with_unison(7, 0.6, 0.1).with_unison_phase_spread(1.0);
        let mut supersaw = Voice::new(&supersaw_config, table.clone(), envelope.clone()).unwrap();
        note_on(&mut supersaw);
        group.bench_with_input(BenchmarkId::new("supersaw", size), &size, |b, _| {
            b.iter(|| {
                supersaw.render(black_box(&mut buffer));
            })
        });

        // === LIVE TABLE ===
        // Same as lead, but every block goes through the published-slot read
        let mut live = Voice::new(&config, computer.reader(), envelope.clone()).unwrap();
        note_on(&mut live);
        group.bench_with_input(BenchmarkId::new("live", size), &size, |b, _| {
            b.iter(|| {
                live.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
