//! Multi-resolution band-limited wavetables.

/*
Wavetables
==========

A wavetable here is a *set* of single-period tables of the same wave, each
with a different amount of high-frequency content removed. Each table is
keyed by the highest fundamental frequency it can be played at without any
of its harmonics crossing Nyquist.

    key (max frequency)     harmonics kept
    -------------------     --------------
    0.5 / 1.25^35 ≈ 0.0002  all that fit in the table
    ...                     ...
    0.5 / 1.25   = 0.4      1
    0.5                     1

Playback at frequency f picks the table with the smallest key >= f: the
richest table that is still alias-free at f. Frequencies above every key use
the highest-key table.

Frequencies are normalized (cycles per sample, 0.5 = Nyquist) and phases are
in [0, 1).


Interpolation
-------------

Lookups between two stored samples are linearly interpolated. The table
wraps, so the last sample blends into the first:

    p    = wrap(phase) × size
    i    = floor(p)
    out  = table[i] + (table[(i + 1) % size] − table[i]) × (p − i)


Lifecycle
---------

Created empty, filled once by a `SpectrumFiller`, then read-only. A new wave
means a new fill into a different `Wavetable`; published tables are never
edited in place (see `engine::computer`).
*/

pub mod spectrum;

pub use spectrum::{FillStatus, SpectrumFiller, SpectrumPlanner};

use crate::{dsp::wrap_phase, Error, Result};

/// Tables of one wave, keyed by the maximum frequency each is alias-free at.
#[derive(Debug, Clone, Default)]
pub struct Wavetable {
    size: usize,
    // Sorted by ascending key
    tables: Vec<(f32, Box<[f32]>)>,
}

impl Wavetable {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            tables: Vec::new(),
        }
    }

    /// Length shared by every table.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Change the table length. Drops all tables.
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
        self.tables.clear();
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = f32> + '_ {
        self.tables.iter().map(|(key, _)| *key)
    }

    /// Store `samples` as the table for fundamentals up to `max_frequency`.
    /// A table already stored under the same key is replaced.
    pub fn add_table(&mut self, samples: Vec<f32>, max_frequency: f32) -> Result<()> {
        if samples.is_empty() {
            return Err(Error::EmptyTable);
        }
        if samples.len() != self.size {
            return Err(Error::TableSizeMismatch {
                expected: self.size,
                actual: samples.len(),
            });
        }
        if !max_frequency.is_finite() || max_frequency <= 0.0 || max_frequency > 0.5 {
            return Err(Error::InvalidFrequency(max_frequency));
        }

        let samples = samples.into_boxed_slice();
        let index = self.tables.partition_point(|(key, _)| *key < max_frequency);
        match self.tables.get_mut(index) {
            Some(entry) if entry.0 == max_frequency => entry.1 = samples,
            _ => self.tables.insert(index, (max_frequency, samples)),
        }
        Ok(())
    }

    pub fn drop_tables(&mut self) {
        self.tables.clear();
    }

    /// Key and samples of the table used at `frequency`.
    #[inline]
    pub fn table_for(&self, frequency: f32) -> Option<(f32, &[f32])> {
        let last = self.tables.len().checked_sub(1)?;
        let index = self
            .tables
            .partition_point(|(key, _)| *key < frequency)
            .min(last);
        let (key, table) = &self.tables[index];
        Some((*key, table))
    }

    /// Interpolated sample at `phase` from the table for `frequency`, or
    /// `None` when no tables are present.
    #[inline]
    pub fn try_sample(&self, phase: f32, frequency: f32) -> Option<f32> {
        let (_, table) = self.table_for(frequency.abs())?;
        let size = table.len();
        if size == 0 {
            return None;
        }

        let position = wrap_phase(phase) * size as f32;
        let whole = position.floor();
        let frac = position - whole;
        // Rounding can land exactly on `size`
        let index = (whole as usize) % size;
        let next = (index + 1) % size;

        Some(table[index] + (table[next] - table[index]) * frac)
    }

    /// Realtime lookup. Silent when the wavetable is empty.
    #[inline]
    pub fn sample(&self, phase: f32, frequency: f32) -> f32 {
        self.try_sample(phase, frequency).unwrap_or(0.0)
    }
}
