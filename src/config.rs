//! Engine-wide settings shared by the voice, the oscillator and the wave
//! computer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result, MAX_UNISON, MIN_TABLE_SIZE};

/// Settings for one synthesizer instance.
///
/// Frequencies inside the engine are normalized to the sample rate (0.5 is
/// Nyquist); [`SynthConfig::normalize`] converts from Hz.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: f32,
    /// Samples per period handed to the spectrum filler.
    pub table_size: usize,
    /// Normalize sampled waves so their peak magnitude is 1.
    pub autoscale: bool,
    /// Longest ramp (in samples) a parameter smoother may use.
    pub smoothing_samples: usize,
    pub unison_number: usize,
    pub unison_spread: f32,
    pub unison_noise: f32,
    pub unison_phase_spread: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            table_size: MIN_TABLE_SIZE,
            autoscale: true,
            smoothing_samples: 480, // 10ms at 48kHz
            unison_number: 1,
            unison_spread: 0.0,
            unison_noise: 0.0,
            unison_phase_spread: 0.0,
        }
    }
}

impl SynthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_table_size(mut self, table_size: usize) -> Self {
        self.table_size = table_size;
        self
    }

    pub fn with_autoscale(mut self, autoscale: bool) -> Self {
        self.autoscale = autoscale;
        self
    }

    pub fn with_smoothing_samples(mut self, samples: usize) -> Self {
        self.smoothing_samples = samples;
        self
    }

    /// Set unison voice count, detune spread and detune noise in one go.
    pub fn with_unison(mut self, number: usize, spread: f32, noise: f32) -> Self {
        self.unison_number = number;
        self.unison_spread = spread;
        self.unison_noise = noise;
        self
    }

    pub fn with_unison_phase_spread(mut self, spread: f32) -> Self {
        self.unison_phase_spread = spread;
        self
    }

    /// Check the settings before handing them to the engine.
    pub fn validate(&self) -> Result<()> {
        if self.table_size < MIN_TABLE_SIZE {
            return Err(Error::TableTooSmall {
                requested: self.table_size,
                minimum: MIN_TABLE_SIZE,
            });
        }
        if !(1..=MAX_UNISON).contains(&self.unison_number) {
            return Err(Error::UnisonOutOfRange(self.unison_number));
        }
        Ok(())
    }

    /// Convert a frequency in Hz into the engine's normalized frequency.
    #[inline]
    pub fn normalize(&self, frequency_hz: f32) -> f32 {
        frequency_hz / self.sample_rate
    }

    /// Convert a normalized frequency back into Hz.
    #[inline]
    pub fn to_hz(&self, frequency: f32) -> f32 {
        frequency * self.sample_rate
    }

    /// Number of samples covering `seconds` at this sample rate.
    #[inline]
    pub fn samples(&self, seconds: f32) -> usize {
        (seconds * self.sample_rate).round().max(0.0) as usize
    }
}
