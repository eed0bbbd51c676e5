//! Spectral band-limiting: turn a `Wave` into a `Wavetable`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::Wavetable;
use crate::{
    dsp::{noise::Noise, wave::Wave},
    Error, Result, MIN_TABLE_SIZE,
};

/*
Band-Limiting in the Frequency Domain
=====================================

A naive wavetable played at a high pitch aliases: harmonics that would sit
above Nyquist fold back down as inharmonic noise. The fix is to prepare
several copies of the table, each with fewer harmonics, and pick the copy
whose highest harmonic stays below Nyquist at the playback frequency.

Vocabulary
----------

  bin           One frequency component of an FFT. With one period sampled
                over N points, bin k is harmonic k of the wave.

  cutoff key    Highest fundamental frequency a table may be played at.
                A table with key f may keep harmonics up to 0.5 / f.

  autoscale     Normalize the sampled period so its peak magnitude is 1.


The Algorithm
-------------

    1. Sample the wave once over N points (one period).
    2. Optionally normalize to a peak of 1.
    3. Forward FFT.
    4. For each cutoff key (0.5, 0.4, 0.32, ... dividing by 1.25, 36 keys):
         - copy the spectrum
         - zero every bin above harmonic floor(0.5 / key), on both the
           positive and the mirrored negative side
         - inverse FFT, keep the real part
         - store it under that key

A ratio of 1.25 between keys is a new table roughly every four semitones.
The lowest key is about 0.0002 (10 Hz at 48 kHz), where every harmonic that
fits in the table is kept.


Cancellation
------------

A fill can run from a background thread that may need to give up early
(shutdown, or a newer wave superseding this one). The cancel predicate is
polled between tables; if it fires, the half-built wavetable is emptied so
nobody can mistake it for a finished one.


Plans and the Planner Lock
--------------------------

Creating FFT plans is the only step that touches shared state, so planning
goes through a `SpectrumPlanner`: one `FftPlanner` behind a mutex, cloned
into every filler that should share it. Fillers cache their plans, so the
lock is taken only when the table size changes. Transforms run unlocked.
*/

/// Number of tables built per fill.
pub const TABLE_COUNT: usize = 36;
/// Ratio between consecutive cutoff keys.
pub const TABLE_RATIO: f32 = 1.25;

/// Cutoff keys of a filled wavetable, highest first.
pub fn table_keys() -> impl Iterator<Item = f32> {
    (0..TABLE_COUNT).map(|k| 0.5 / TABLE_RATIO.powi(k as i32))
}

/// Highest harmonic a table keyed `key` keeps at `size` samples per period.
pub fn max_harmonic(key: f32, size: usize) -> usize {
    let allowed = (0.5 / key).floor() as usize;
    allowed.clamp(1, size / 2 - 1)
}

/// Shared, lock-guarded FFT planner.
#[derive(Clone)]
pub struct SpectrumPlanner {
    planner: Arc<Mutex<FftPlanner<f32>>>,
}

impl Default for SpectrumPlanner {
    fn default() -> Self {
        Self {
            planner: Arc::new(Mutex::new(FftPlanner::new())),
        }
    }
}

impl SpectrumPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward and inverse plans for `size`-point transforms.
    pub fn plan(&self, size: usize) -> (Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>) {
        let mut planner = self.planner.lock().unwrap_or_else(PoisonError::into_inner);
        (planner.plan_fft_forward(size), planner.plan_fft_inverse(size))
    }
}

impl fmt::Debug for SpectrumPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumPlanner").finish_non_exhaustive()
    }
}

/// Outcome of a fill that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    Complete,
    /// Cancelled between tables; the wavetable was emptied.
    Interrupted,
}

struct Plans {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

/// Builds band-limited wavetables from waves. Not realtime-safe: run it on
/// a background thread.
pub struct SpectrumFiller {
    planner: SpectrumPlanner,
    autoscale: bool,
    noise: Noise,
    plans: Option<Plans>,
    interrupted: bool,
}

impl SpectrumFiller {
    pub fn new(planner: SpectrumPlanner) -> Self {
        Self {
            planner,
            autoscale: true,
            noise: Noise::default(),
            plans: None,
            interrupted: false,
        }
    }

    pub fn with_autoscale(mut self, autoscale: bool) -> Self {
        self.autoscale = autoscale;
        self
    }

    pub fn set_autoscale(&mut self, autoscale: bool) {
        self.autoscale = autoscale;
    }

    pub fn autoscale(&self) -> bool {
        self.autoscale
    }

    /// Whether the most recent fill was cancelled.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Replace the contents of `wavetable` with band-limited tables of
    /// `wave`, each `sample_count` samples long.
    pub fn fill(
        &mut self,
        wave: &Wave,
        wavetable: &mut Wavetable,
        sample_count: usize,
    ) -> Result<FillStatus> {
        self.fill_with_cancel(wave, wavetable, sample_count, || false)
    }

    /// Like [`fill`](Self::fill), polling `cancel` between tables.
    pub fn fill_with_cancel(
        &mut self,
        wave: &Wave,
        wavetable: &mut Wavetable,
        sample_count: usize,
        mut cancel: impl FnMut() -> bool,
    ) -> Result<FillStatus> {
        if sample_count < MIN_TABLE_SIZE {
            return Err(Error::TableTooSmall {
                requested: sample_count,
                minimum: MIN_TABLE_SIZE,
            });
        }

        self.interrupted = false;
        wavetable.set_size(sample_count);
        let (forward, inverse) = self.plans_for(sample_count);

        let mut spectrum = self.sample_period(wave, sample_count);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0, 0.0); scratch_len];
        forward.process_with_scratch(&mut spectrum, &mut scratch);

        let mut work = vec![Complex::new(0.0, 0.0); sample_count];
        let norm = 1.0 / sample_count as f32;

        for key in table_keys() {
            if cancel() {
                wavetable.drop_tables();
                self.interrupted = true;
                return Ok(FillStatus::Interrupted);
            }

            work.copy_from_slice(&spectrum);
            band_limit(&mut work, max_harmonic(key, sample_count));
            inverse.process_with_scratch(&mut work, &mut scratch);

            let table = work.iter().map(|bin| bin.re * norm).collect();
            wavetable.add_table(table, key)?;
        }

        Ok(FillStatus::Complete)
    }

    fn plans_for(&mut self, size: usize) -> (Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>) {
        match &self.plans {
            Some(plans) if plans.size == size => {
                (Arc::clone(&plans.forward), Arc::clone(&plans.inverse))
            }
            _ => {
                let (forward, inverse) = self.planner.plan(size);
                self.plans = Some(Plans {
                    size,
                    forward: Arc::clone(&forward),
                    inverse: Arc::clone(&inverse),
                });
                (forward, inverse)
            }
        }
    }

    /// One period of `wave` as complex input for the forward transform.
    fn sample_period(&mut self, wave: &Wave, size: usize) -> Vec<Complex<f32>> {
        // One period per table: the fundamental's playback frequency
        let frequency = 1.0 / size as f32;
        let mut samples: Vec<f32> = (0..size)
            .map(|i| wave.sample(i as f32 / size as f32, frequency, i, &mut self.noise))
            .collect();

        if self.autoscale {
            let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            if peak > f32::EPSILON {
                let gain = 1.0 / peak;
                for sample in samples.iter_mut() {
                    *sample *= gain;
                }
            }
        }

        samples.into_iter().map(|s| Complex::new(s, 0.0)).collect()
    }
}

impl fmt::Debug for SpectrumFiller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumFiller")
            .field("autoscale", &self.autoscale)
            .field("plan_size", &self.plans.as_ref().map(|p| p.size))
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

/// Zero every bin above `harmonic` (and its mirror image).
fn band_limit(spectrum: &mut [Complex<f32>], harmonic: usize) {
    let size = spectrum.len();
    for bin in &mut spectrum[harmonic + 1..size - harmonic] {
        *bin = Complex::new(0.0, 0.0);
    }
}
