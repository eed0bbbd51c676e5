//! Parameter smoothing: turn stepped control values into click-free ramps.

/*
Parameter Smoothing
===================

Control values arrive in steps: a knob moves, an automation lane jumps, a
message lands at the start of a block. Applying a step directly to a gain or
a frequency produces an audible click ("zipper noise"). A smoother sits
between the control value and the audio loop and spreads each step over a
short ramp.

Vocabulary
----------

  target        The value most recently passed to `set_value()`.

  current       The value the audio loop actually uses this sample.

  increment     Per-sample change of a linear ramp. Exactly zero once the
                target has been reached.

  ramp length   How many samples a step is spread over.


Linear Ramp (`Smoother`)
------------------------

    value
      x ┤            ╭────────
        │          ╱
        │        ╱
     v0 ┼──────╯
        └──────┬─────┬────────→ samples
            set_value  + ramp length

The ramp length adapts to how often the value changes: it is the number of
samples elapsed since the previous `set_value()`, capped at a configured
maximum. A knob sending a new value every 64-sample block gets 64-sample
ramps that finish right before the next step arrives; a value that changes
once in a while gets the full maximum ramp.

Arrival is tracked with a sample counter rather than by comparing floats, so
after exactly `ramp length` samples the value equals the target bit for bit
and the increment is zero. Neither overshoots.


One-Pole (`OnePoleSmoother`)
----------------------------

    z ← tc × (z − x) + x

An exponential approach: each sample removes the same fraction of the
remaining distance. `tc` is chosen so that after N configured samples 99.99%
of the distance is covered:

    tc = 0.0001^(1/N)

It never overshoots and never lands exactly on the target, which is fine for
gains and cutoffs.

Both run per sample in O(1) without allocating.
*/

/// Common interface for both smoother designs.
pub trait Smoothing {
    /// Start moving toward `target`.
    fn set_value(&mut self, target: f32);

    /// Jump to `value` immediately, dropping any ramp in progress.
    fn reset(&mut self, value: f32);

    /// The value used for the most recent sample.
    fn current(&self) -> f32;

    /// Advance one sample and return the new value.
    fn next_sample(&mut self) -> f32;

    /// Write the next `buffer.len()` smoothed values into `buffer`.
    fn fill(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Multiply `buffer` in place by the next smoothed values.
    fn multiply(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample *= self.next_sample();
        }
    }
}

/// Linear ramp smoother with adaptive ramp length.
#[derive(Debug, Clone)]
pub struct Smoother {
    current: f32,
    target: f32,
    increment: f32,
    remaining: usize,
    since_change: usize,
    max_samples: usize,
}

impl Smoother {
    pub fn new(max_samples: usize, initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            remaining: 0,
            since_change: usize::MAX,
            max_samples,
        }
    }

    /// Longest ramp used for a single step. Applies from the next `set_value()`.
    pub fn set_max_samples(&mut self, max_samples: usize) {
        self.max_samples = max_samples;
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn increment(&self) -> f32 {
        self.increment
    }

    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }

    /// Move `samples` samples forward along the current ramp.
    #[inline]
    pub fn advance(&mut self, samples: usize) {
        self.since_change = self.since_change.saturating_add(samples);
        if self.remaining == 0 {
            return;
        }

        if samples >= self.remaining {
            self.finish();
            return;
        }

        self.remaining -= samples;
        self.current += samples as f32 * self.increment;

        // Rounding must not carry the value past the target
        let overshot = (self.increment > 0.0 && self.current >= self.target)
            || (self.increment < 0.0 && self.current <= self.target);
        if overshot {
            self.finish();
        }
    }

    #[inline]
    fn finish(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.remaining = 0;
    }
}

impl Smoothing for Smoother {
    fn set_value(&mut self, target: f32) {
        let ramp = self.since_change.min(self.max_samples);
        self.since_change = 0;
        self.target = target;

        if ramp == 0 || target == self.current {
            self.finish();
            return;
        }

        self.remaining = ramp;
        self.increment = (target - self.current) / ramp as f32;
    }

    fn reset(&mut self, value: f32) {
        self.target = value;
        self.since_change = usize::MAX;
        self.finish();
    }

    fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        self.advance(1);
        self.current
    }
}

/// Exponential one-pole smoother.
#[derive(Debug, Clone)]
pub struct OnePoleSmoother {
    z: f32,
    target: f32,
    time_constant: f32,
    samples: usize,
}

impl OnePoleSmoother {
    /// `samples` is how long it takes to cover 99.99% of a step.
    pub fn new(samples: usize, initial: f32) -> Self {
        let mut smoother = Self {
            z: initial,
            target: initial,
            time_constant: 0.0,
            samples: 0,
        };
        smoother.set_samples(samples);
        smoother
    }

    pub fn set_samples(&mut self, samples: usize) {
        self.samples = samples;
        self.time_constant = if samples == 0 {
            0.0
        } else {
            1e-4_f32.powf(1.0 / samples as f32)
        };
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn time_constant(&self) -> f32 {
        self.time_constant
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

impl Smoothing for OnePoleSmoother {
    fn set_value(&mut self, target: f32) {
        self.target = target;
    }

    fn reset(&mut self, value: f32) {
        self.z = value;
        self.target = value;
    }

    fn current(&self) -> f32 {
        self.z
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        self.z = self.time_constant * (self.z - self.target) + self.target;
        self.z
    }
}
