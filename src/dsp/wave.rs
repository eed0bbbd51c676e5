//! Periodic wave definitions sampled by the spectrum filler.

use std::f32::consts::{PI, TAU};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{noise::Noise, wrap_phase};

/*
Waves
=====

A `Wave` is a recipe for one period of a periodic signal: give it a phase in
[0, 1) and it returns one sample. It never stores audio; the spectrum filler
samples it once per period and turns the result into band-limited tables.

Vocabulary
----------

  phase         Position within one period, wrapped into [0, 1).

  frequency     Normalized playback frequency (cycles per sample). 0.5 is
                Nyquist. Waves that build themselves from harmonics use it
                to skip partials that would alias; everything else ignores it.

  sample        Running sample index. Only time-dependent waves (crossfade)
                look at it.

  decorator     A wave wrapping one or two inner waves and transforming their
                output (harmonics, modulation, scale, offset, crossfade).


Composition
-----------

Decorators hold their inner waves behind `Arc`, so a wave tree can be shared
freely between a control thread and the background filler:

    Scaled(0.5)
      └── Harmonics([1.0, 0.5, 0.25])
            └── Raw(Sine)

A single `Arc` owner means the decorator owns its inner wave outright; several
owners means the inner wave is borrowed by more than one tree.

Only `Wave::Noise` keeps state, and that state lives in the `Noise` passed to
`sample()`, so every wave is `Sync` and a tree can be sampled from any number
of threads as long as each brings its own `Noise`.
*/

/// Largest number of partials a harmonics decorator accepts.
pub const MAX_HARMONICS: usize = 64;

/// Base waveform shapes. Each takes one parameter in [0, 1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Sine,
    /// Parameter moves the peak (0.5 = symmetric).
    Triangle,
    Square,
    Sawtooth,
    /// Parameter is the duty cycle.
    Pulse,
    /// Signed power of a sine; parameter 0.5 is a plain sine.
    Power,
    /// Gaussian bump; parameter is the width.
    Gauss,
    /// Rectified sine; parameter raises the clipping threshold.
    Diode,
    /// Sine sweeping upwards within the period.
    Chirp,
}

impl Shape {
    #[inline]
    pub fn evaluate(self, phase: f32, param: f32) -> f32 {
        let param = param.clamp(0.0, 1.0);
        match self {
            Shape::Sine => (TAU * phase).sin(),
            Shape::Triangle => {
                let peak = param.clamp(0.01, 0.99);
                if phase < peak {
                    -1.0 + 2.0 * phase / peak
                } else {
                    1.0 - 2.0 * (phase - peak) / (1.0 - peak)
                }
            }
            Shape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Shape::Sawtooth => 2.0 * phase - 1.0,
            Shape::Pulse => {
                if phase < param.clamp(0.01, 0.99) {
                    1.0
                } else {
                    -1.0
                }
            }
            Shape::Power => {
                let s = (TAU * phase).sin();
                let exponent = (8.0 * param - 4.0).exp2();
                s.signum() * s.abs().powf(exponent)
            }
            Shape::Gauss => {
                let sigma = 0.01 + 0.2 * param;
                let x = phase - 0.5;
                2.0 * (-(x * x) / (2.0 * sigma * sigma)).exp() - 1.0
            }
            Shape::Diode => {
                let threshold = (2.0 * param - 1.0).min(0.99);
                let s = (TAU * phase).sin();
                2.0 * (s - threshold).max(0.0) / (1.0 - threshold) - 1.0
            }
            Shape::Chirp => (PI * phase * (2.0 + 14.0 * param * phase)).sin(),
        }
    }
}

/// How a modulated wave combines its carrier and modulator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationKind {
    /// Carrier multiplied by the modulator, blended by `amplitude`.
    Ring,
    /// Modulator offsets the carrier's phase by up to `amplitude` periods.
    Frequency,
}

/// One partial of a harmonics decorator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Harmonic {
    pub amplitude: f32,
    /// Phase offset in periods.
    pub phase: f32,
}

impl Harmonic {
    pub fn new(amplitude: f32, phase: f32) -> Self {
        Self { amplitude, phase }
    }
}

#[derive(Debug, Clone)]
pub enum Wave {
    Raw {
        shape: Shape,
        param: f32,
    },
    /// Sum of the inner wave played at integer multiples of the phase.
    /// Entry `n` is harmonic `n + 1`, so entry 0 is the fundamental.
    Harmonics {
        inner: Arc<Wave>,
        harmonics: Vec<Harmonic>,
    },
    Modulated {
        carrier: Arc<Wave>,
        modulator: Arc<Wave>,
        kind: ModulationKind,
        /// Modulator runs at `index` times the carrier frequency.
        index: u32,
        amplitude: f32,
    },
    Scaled {
        inner: Arc<Wave>,
        scale: f32,
    },
    Translated {
        inner: Arc<Wave>,
        offset: f32,
    },
    /// Linear blend from `from` to `to` over `duration` samples.
    Crossfade {
        from: Arc<Wave>,
        to: Arc<Wave>,
        duration: usize,
    },
    Noise,
}

impl Wave {
    pub fn raw(shape: Shape) -> Self {
        let param = match shape {
            Shape::Triangle | Shape::Pulse | Shape::Power => 0.5,
            _ => 0.0,
        };
        Wave::Raw { shape, param }
    }

    pub fn sine() -> Self {
        Self::raw(Shape::Sine)
    }

    pub fn sawtooth() -> Self {
        Self::raw(Shape::Sawtooth)
    }

    pub fn square() -> Self {
        Self::raw(Shape::Square)
    }

    pub fn triangle() -> Self {
        Self::raw(Shape::Triangle)
    }

    pub fn noise() -> Self {
        Wave::Noise
    }

    /// Wrap `self` in a harmonics decorator. Extra partials past
    /// [`MAX_HARMONICS`] are dropped.
    pub fn with_harmonics(self, amplitudes: &[f32]) -> Self {
        let harmonics = amplitudes
            .iter()
            .take(MAX_HARMONICS)
            .map(|&amplitude| Harmonic::new(amplitude, 0.0))
            .collect();
        Wave::Harmonics {
            inner: Arc::new(self),
            harmonics,
        }
    }

    pub fn modulated(
        carrier: impl Into<Arc<Wave>>,
        modulator: impl Into<Arc<Wave>>,
        kind: ModulationKind,
        index: u32,
        amplitude: f32,
    ) -> Self {
        Wave::Modulated {
            carrier: carrier.into(),
            modulator: modulator.into(),
            kind,
            index: index.max(1),
            amplitude,
        }
    }

    pub fn scaled(self, scale: f32) -> Self {
        Wave::Scaled {
            inner: Arc::new(self),
            scale,
        }
    }

    pub fn translated(self, offset: f32) -> Self {
        Wave::Translated {
            inner: Arc::new(self),
            offset,
        }
    }

    pub fn crossfade(from: impl Into<Arc<Wave>>, to: impl Into<Arc<Wave>>, duration: usize) -> Self {
        Wave::Crossfade {
            from: from.into(),
            to: to.into(),
            duration,
        }
    }

    /// Update the shape parameter of a raw wave. Returns false for other kinds.
    pub fn set_param(&mut self, value: f32) -> bool {
        match self {
            Wave::Raw { param, .. } => {
                *param = value.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    /// Set one partial of a harmonics decorator, growing the list as needed.
    /// `number` is 1-based. Returns false when `self` has no harmonics or
    /// `number` is out of range.
    pub fn set_harmonic(&mut self, number: usize, amplitude: f32, phase: f32) -> bool {
        let Wave::Harmonics { harmonics, .. } = self else {
            return false;
        };
        if number == 0 || number > MAX_HARMONICS {
            return false;
        }
        if harmonics.len() < number {
            harmonics.resize(number, Harmonic::default());
        }
        harmonics[number - 1] = Harmonic::new(amplitude, wrap_phase(phase));
        true
    }

    /// Update index and amplitude of a modulated wave.
    pub fn set_modulation(&mut self, new_index: u32, new_amplitude: f32) -> bool {
        match self {
            Wave::Modulated {
                index, amplitude, ..
            } => {
                *index = new_index.max(1);
                *amplitude = new_amplitude;
                true
            }
            _ => false,
        }
    }

    pub fn set_scale(&mut self, value: f32) -> bool {
        match self {
            Wave::Scaled { scale, .. } => {
                *scale = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_offset(&mut self, value: f32) -> bool {
        match self {
            Wave::Translated { offset, .. } => {
                *offset = value;
                true
            }
            _ => false,
        }
    }

    /// False when the tree contains a noise source, whose output depends on
    /// the caller's `Noise` state rather than on phase alone.
    pub fn is_immutable(&self) -> bool {
        match self {
            Wave::Raw { .. } => true,
            Wave::Noise => false,
            Wave::Harmonics { inner, .. }
            | Wave::Scaled { inner, .. }
            | Wave::Translated { inner, .. } => inner.is_immutable(),
            Wave::Modulated {
                carrier, modulator, ..
            } => carrier.is_immutable() && modulator.is_immutable(),
            Wave::Crossfade { from, to, .. } => from.is_immutable() && to.is_immutable(),
        }
    }

    /// Evaluate the wave. O(depth of the tree), never allocates.
    pub fn sample(&self, phase: f32, frequency: f32, sample: usize, noise: &mut Noise) -> f32 {
        let phase = wrap_phase(phase);
        match self {
            Wave::Raw { shape, param } => shape.evaluate(phase, *param),

            Wave::Harmonics { inner, harmonics } => {
                let mut sum = 0.0;
                for (i, harmonic) in harmonics.iter().enumerate() {
                    let number = (i + 1) as f32;
                    let partial_frequency = frequency * number;
                    if frequency > 0.0 && partial_frequency >= 0.5 {
                        break;
                    }
                    if harmonic.amplitude == 0.0 {
                        continue;
                    }
                    let partial_phase = phase * number + harmonic.phase;
                    sum += harmonic.amplitude
                        * inner.sample(partial_phase, partial_frequency, sample, noise);
                }
                sum
            }

            Wave::Modulated {
                carrier,
                modulator,
                kind,
                index,
                amplitude,
            } => {
                let index = *index as f32;
                let m = modulator.sample(phase * index, frequency * index, sample, noise);
                match kind {
                    ModulationKind::Ring => {
                        let c = carrier.sample(phase, frequency, sample, noise);
                        c * (1.0 - amplitude) + c * m * amplitude
                    }
                    ModulationKind::Frequency => {
                        carrier.sample(phase + amplitude * m, frequency, sample, noise)
                    }
                }
            }

            Wave::Scaled { inner, scale } => scale * inner.sample(phase, frequency, sample, noise),

            Wave::Translated { inner, offset } => {
                inner.sample(phase, frequency, sample, noise) + offset
            }

            Wave::Crossfade { from, to, duration } => {
                let t = if *duration == 0 {
                    1.0
                } else {
                    (sample as f32 / *duration as f32).min(1.0)
                };
                if t >= 1.0 {
                    return to.sample(phase, frequency, sample, noise);
                }
                let a = from.sample(phase, frequency, sample, noise);
                let b = to.sample(phase, frequency, sample, noise);
                a * (1.0 - t) + b * t
            }

            Wave::Noise => noise.next_sample(),
        }
    }
}

impl Default for Wave {
    fn default() -> Self {
        Wave::sine()
    }
}
