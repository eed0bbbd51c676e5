use std::f32::consts::TAU;
use std::sync::Arc;

use rustfft::{num_complex::Complex, FftPlanner};
use wavesynth::{
    dsp::{oscillator::Oscillator, wave::Wave},
    wavetable::{
        spectrum::{max_harmonic, table_keys, TABLE_COUNT},
        FillStatus, SpectrumFiller, SpectrumPlanner, Wavetable,
    },
    Error,
};

fn filled(wave: &Wave, size: usize) -> Wavetable {
    let mut wavetable = Wavetable::default();
    let status = SpectrumFiller::new(SpectrumPlanner::new())
        .fill(wave, &mut wavetable, size)
        .unwrap();
    assert_eq!(status, FillStatus::Complete);
    wavetable
}

fn magnitudes(table: &[f32]) -> Vec<f32> {
    let fft = FftPlanner::new().plan_fft_forward(table.len());
    let mut buffer: Vec<Complex<f32>> = table.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);
    buffer.iter().map(|c| c.norm()).collect()
}

#[test]
fn sine_fill_builds_every_table() {
    let wavetable = filled(&Wave::sine(), 4096);
    assert_eq!(wavetable.len(), TABLE_COUNT);
    assert_eq!(wavetable.size(), 4096);

    // The lowest key keeps the most harmonics; a sine has only one to keep
    let lowest = wavetable.keys().next().unwrap();
    let (_, table) = wavetable.table_for(lowest).unwrap();
    let spectrum = magnitudes(table);
    let fundamental = spectrum[1];
    assert!(fundamental > 2000.0, "fundamental {fundamental}");
    for (bin, &m) in spectrum.iter().enumerate().take(2048).skip(2) {
        assert!(m < fundamental * 1e-4, "bin {bin}: {m}");
    }
}

#[test]
fn pure_tone_above_cutoff_is_removed() {
    // Harmonic 40 of a sine: survives only in tables allowing 40 harmonics
    let mut amplitudes = vec![0.0; 40];
    amplitudes[39] = 1.0;
    let wavetable = filled(&Wave::sine().with_harmonics(&amplitudes), 4096);

    for key in table_keys() {
        let (_, table) = wavetable.table_for(key).unwrap();
        let spectrum = magnitudes(table);
        let limit = max_harmonic(key, 4096);
        let energy_above: f32 = spectrum[limit + 1..2048].iter().map(|m| m * m).sum();
        assert!(energy_above < 1e-3, "key {key}: {energy_above}");

        if limit >= 40 {
            assert!(spectrum[40] > 1000.0, "key {key} lost its tone");
        } else {
            assert!(table.iter().all(|s| s.abs() < 1e-3), "key {key} is not silent");
        }
    }
}

#[test]
fn fill_rejects_short_periods() {
    let mut wavetable = Wavetable::default();
    let result = SpectrumFiller::new(SpectrumPlanner::new()).fill(&Wave::sawtooth(), &mut wavetable, 4095);
    assert!(matches!(result, Err(Error::TableTooSmall { requested: 4095, .. })));
}

#[test]
fn higher_frequencies_pick_safer_tables() {
    let wavetable = filled(&Wave::sawtooth(), 4096);
    let mut previous = 0.0;
    for i in 1..=1000 {
        let f = i as f32 * 0.0005;
        let (key, _) = wavetable.table_for(f).unwrap();
        assert!(key >= previous);
        assert!(key >= f || key == 0.5);
        previous = key;
    }
    assert_eq!(wavetable.table_for(0.49).unwrap().0, 0.5);
    assert_eq!(wavetable.table_for(0.5).unwrap().0, 0.5);
}

#[test]
fn oscillator_matches_direct_lookup() {
    let wavetable = Arc::new(filled(&Wave::sawtooth(), 4096));
    let mut osc = Oscillator::new().with_wavetable(Arc::clone(&wavetable));
    osc.set_unison_number(1).unwrap();
    osc.set_frequency(0.01);
    osc.set_value(1.0);

    let mut out = [0.0f32; 64];
    osc.fill(&mut out);

    for (i, &s) in out.iter().enumerate() {
        let phase = (i as f32 * 0.01).fract();
        let expected = wavetable.sample(phase, 0.01);
        assert!((s - expected).abs() < 1e-3, "sample {i}: {s} vs {expected}");
    }
}

#[test]
fn oscillator_output_is_a_sine_at_the_right_pitch() {
    let wavetable = Arc::new(filled(&Wave::sine(), 4096));
    let mut osc = Oscillator::new().with_wavetable(wavetable);
    osc.set_frequency(0.125);

    let mut out = [0.0f32; 16];
    osc.fill(&mut out);
    for (i, &s) in out.iter().enumerate() {
        let expected = (TAU * i as f32 * 0.125).sin();
        assert!((s - expected).abs() < 1e-3, "sample {i}: {s} vs {expected}");
    }
}
