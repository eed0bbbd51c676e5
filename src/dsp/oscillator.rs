use std::sync::Arc;

use super::{noise::Noise, wrap_phase};
use crate::{engine::WavetableReader, wavetable::Wavetable, Error, Result, MAX_UNISON};

/*
Unison Wavetable Oscillator
===========================

Plays a band-limited `Wavetable` at a normalized frequency (cycles per
sample). Several detuned copies ("unison voices") of the same wave can be
stacked to thicken the sound.

Unison Layout
-------------

With n voices, voice i sits at a position between -1 and 1:

    position(i) = 2i / (n − 1) − 1        (0 when n = 1)

    n = 5:   -1    -0.5    0    0.5    1
              │      │     │     │     │
              lowest      center     highest

Its frequency is the base frequency shifted by that position times the
spread, at most ±5% of the base at full spread:

    f(i) = f × (1 + position(i) × spread × 0.05)

Detune Noise
------------

With `noise > 0` every voice frequency also wobbles randomly each sample.
The wobble scales with sqrt(f) so it stays perceptually similar across the
keyboard, and with a triangular weight that is largest for the center voice
and smallest, but never zero, at the outer voices:

    weight(i) = 1 − |position(i)| × (n − 1) / (n + 1)

Each oscillator draws from its own noise stream, so stacked oscillators do
not wobble in lockstep.

Output Level
------------

Summing n voices raises the level. The block is scaled by

    value × n^-0.75

which sits between keeping the peak constant (n^-1) and keeping the power of
uncorrelated voices constant (n^-0.5).

Wavetable Source
----------------

The oscillator reads from either a fixed table it shares ownership of, or a
live `WavetableReader` published by a background `WaveComputer`. The live
reader is polled once per block and never blocks; if no table is
available, the block is silent and phases still advance.
*/

/// Largest relative detune of the outermost unison voices.
pub const MAX_DETUNE: f32 = 0.05;
/// Frequency jitter per unit of `noise × sqrt(f)`.
pub const MAX_JITTER: f32 = 0.002;

/// Where an oscillator gets its wavetable from.
#[derive(Debug, Clone)]
pub enum WavetableSource {
    Fixed(Arc<Wavetable>),
    Live(WavetableReader),
}

impl From<Arc<Wavetable>> for WavetableSource {
    fn from(table: Arc<Wavetable>) -> Self {
        Self::Fixed(table)
    }
}

impl From<Wavetable> for WavetableSource {
    fn from(table: Wavetable) -> Self {
        Self::Fixed(Arc::new(table))
    }
}

impl From<WavetableReader> for WavetableSource {
    fn from(reader: WavetableReader) -> Self {
        Self::Live(reader)
    }
}

#[derive(Debug, Clone)]
struct Unison {
    count: usize,
    spread: f32,
    noise: f32,
    initial_phase: f32,
    phase_spread: f32,
    phases: [f32; MAX_UNISON],
    detune: [f32; MAX_UNISON],
    weights: [f32; MAX_UNISON],
    gain: f32,
}

impl Unison {
    fn new() -> Self {
        let mut unison = Self {
            count: 1,
            spread: 0.0,
            noise: 0.0,
            initial_phase: 0.0,
            phase_spread: 0.0,
            phases: [0.0; MAX_UNISON],
            detune: [0.0; MAX_UNISON],
            weights: [0.0; MAX_UNISON],
            gain: 1.0,
        };
        unison.update_coefficients();
        unison
    }

    fn position(&self, voice: usize) -> f32 {
        if self.count == 1 {
            0.0
        } else {
            2.0 * voice as f32 / (self.count - 1) as f32 - 1.0
        }
    }

    /// Starting phase of `voice` relative to `base`.
    fn start_phase(&self, base: f32, voice: usize) -> f32 {
        wrap_phase(base + self.phase_spread * voice as f32 / MAX_UNISON as f32)
    }

    fn update_coefficients(&mut self) {
        let n = self.count as f32;
        let taper = (n - 1.0) / (n + 1.0);
        for voice in 0..self.count {
            let position = self.position(voice);
            self.detune[voice] = position * self.spread * MAX_DETUNE;
            self.weights[voice] = 1.0 - position.abs() * taper;
        }
        self.gain = (self.count as f32).powf(-0.75);
    }
}

/// Multi-voice wavetable oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    source: Option<WavetableSource>,
    frequency: f32,
    value: f32,
    unison: Unison,
    noise: Noise,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Oscillator {
    pub fn new() -> Self {
        Self {
            source: None,
            frequency: 0.0,
            value: 1.0,
            unison: Unison::new(),
            noise: Noise::fresh(),
        }
    }

    /// Reseed the detune noise, e.g. for reproducible renders.
    pub fn set_noise_seed(&mut self, seed: u32) {
        self.noise = Noise::new(seed);
    }

    pub fn with_wavetable(mut self, source: impl Into<WavetableSource>) -> Self {
        self.set_wavetable(source);
        self
    }

    pub fn set_wavetable(&mut self, source: impl Into<WavetableSource>) {
        self.source = Some(source.into());
    }

    pub fn clear_wavetable(&mut self) {
        self.source = None;
    }

    /// Normalized frequency used by `fill()`.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Output amplitude.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Change the number of stacked voices. Existing voices keep their
    /// phase; added voices start from the initial phase spread.
    pub fn set_unison_number(&mut self, count: usize) -> Result<()> {
        if !(1..=MAX_UNISON).contains(&count) {
            return Err(Error::UnisonOutOfRange(count));
        }
        self.resize_unison(count);
        Ok(())
    }

    /// Like [`set_unison_number`](Self::set_unison_number), clamping `count`
    /// into range instead of failing. Returns the count applied.
    pub fn set_unison_number_clamped(&mut self, count: usize) -> usize {
        let count = count.clamp(1, MAX_UNISON);
        self.resize_unison(count);
        count
    }

    fn resize_unison(&mut self, count: usize) {
        let previous = self.unison.count;
        self.unison.count = count;
        for voice in previous..count {
            self.unison.phases[voice] = self.unison.start_phase(self.unison.initial_phase, voice);
        }
        self.unison.update_coefficients();
    }

    pub fn unison_number(&self) -> usize {
        self.unison.count
    }

    /// Detune between the outermost voices, 0 to 1.
    pub fn set_unison_spread(&mut self, spread: f32) {
        self.unison.spread = spread.clamp(0.0, 1.0);
        self.unison.update_coefficients();
    }

    pub fn unison_spread(&self) -> f32 {
        self.unison.spread
    }

    /// Random frequency jitter, 0 to 1.
    pub fn set_unison_noise(&mut self, noise: f32) {
        self.unison.noise = noise.clamp(0.0, 1.0);
    }

    pub fn unison_noise(&self) -> f32 {
        self.unison.noise
    }

    /// Phase voices are set to by `reset()`.
    pub fn set_initial_phase(&mut self, phase: f32) {
        self.unison.initial_phase = wrap_phase(phase);
    }

    /// How far apart voice start phases are, 0 (all equal) to 1.
    pub fn set_phase_spread(&mut self, spread: f32) {
        self.unison.phase_spread = spread.clamp(0.0, 1.0);
    }

    /// Move every voice to `phase`, keeping the configured phase spread.
    pub fn set_phase(&mut self, phase: f32) {
        for voice in 0..self.unison.count {
            self.unison.phases[voice] = self.unison.start_phase(phase, voice);
        }
    }

    /// Phase of the first voice.
    pub fn phase(&self) -> f32 {
        self.unison.phases[0]
    }

    /// Active voice phases.
    pub fn phases(&self) -> &[f32] {
        &self.unison.phases[..self.unison.count]
    }

    /// Return every voice to the initial phase.
    pub fn reset(&mut self) {
        self.set_phase(self.unison.initial_phase);
    }

    /// Render one block at the current frequency.
    pub fn fill(&mut self, out: &mut [f32]) {
        let frequency = self.frequency;
        self.render(out, |_| frequency);
    }

    /// Render one block with a per-sample frequency. Samples past the end of
    /// `frequencies` are silent.
    pub fn fill_modulated(&mut self, out: &mut [f32], frequencies: &[f32]) {
        let len = out.len().min(frequencies.len());
        let (modulated, rest) = out.split_at_mut(len);
        self.render(modulated, |i| frequencies[i]);
        rest.fill(0.0);
    }

    fn render(&mut self, out: &mut [f32], frequency_at: impl Fn(usize) -> f32) {
        let level = self.value * self.unison.gain;
        let unison = &mut self.unison;
        let noise = &mut self.noise;

        let rendered = match &self.source {
            Some(WavetableSource::Fixed(table)) => {
                render_voices(table, unison, noise, out, &frequency_at);
                true
            }
            Some(WavetableSource::Live(reader)) => reader
                .read(|table| render_voices(table, unison, noise, out, &frequency_at))
                .is_some(),
            None => false,
        };

        if rendered {
            for sample in out.iter_mut() {
                *sample *= level;
            }
        } else {
            out.fill(0.0);
            advance_phases(unison, out.len(), &frequency_at);
        }
    }
}

fn voice_frequency(unison: &Unison, noise: &mut Noise, voice: usize, base: f32) -> f32 {
    let mut frequency = base * (1.0 + unison.detune[voice]);
    if unison.noise > 0.0 {
        let jitter = unison.noise * base.abs().sqrt() * unison.weights[voice] * MAX_JITTER;
        frequency += jitter * noise.next_sample();
    }
    frequency
}

fn render_voices(
    table: &Wavetable,
    unison: &mut Unison,
    noise: &mut Noise,
    out: &mut [f32],
    frequency_at: &impl Fn(usize) -> f32,
) {
    for (i, sample) in out.iter_mut().enumerate() {
        let base = frequency_at(i);
        let mut sum = 0.0;
        for voice in 0..unison.count {
            let frequency = voice_frequency(unison, noise, voice, base);
            let phase = unison.phases[voice];
            sum += table.sample(phase, frequency);
            unison.phases[voice] = wrap_phase(phase + frequency);
        }
        *sample = sum;
    }
}

// Keeps voices in time while no table is available
fn advance_phases(unison: &mut Unison, samples: usize, frequency_at: &impl Fn(usize) -> f32) {
    for i in 0..samples {
        let base = frequency_at(i);
        for voice in 0..unison.count {
            let frequency = base * (1.0 + unison.detune[voice]);
            unison.phases[voice] = wrap_phase(unison.phases[voice] + frequency);
        }
    }
}
