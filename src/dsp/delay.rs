use crate::{Error, Result};

/// Circular buffer with a runtime-adjustable read offset.
///
/// Storage is allocated once in `new()`; every other method is realtime-safe.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay: usize,
}

impl DelayLine {
    /// A delay line that can hold delays of up to `max_delay - 1` samples.
    pub fn new(max_delay: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay.max(1)],
            write_pos: 0,
            delay: 0,
        }
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len()
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Change the read offset. Fails when `samples >= max_delay()`.
    pub fn set_delay(&mut self, samples: usize) -> Result<()> {
        if samples >= self.buffer.len() {
            return Err(Error::DelayTooLong {
                requested: samples,
                max: self.buffer.len(),
            });
        }
        self.delay = samples;
        Ok(())
    }

    /// Push one sample into the line.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Sample written `delay() + 1` writes ago; with a zero delay, the most
    /// recent write.
    #[inline]
    pub fn read(&self) -> f32 {
        self.read_at(self.delay)
    }

    #[inline]
    fn read_at(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let newest = (self.write_pos + len - 1) % len;
        self.buffer[(newest + len - delay) % len]
    }

    /// Fractional read between the two neighbouring integer delays.
    /// `delay` is clamped to the line's capacity.
    #[inline]
    pub fn read_interpolated(&self, delay: f32) -> f32 {
        let max = (self.buffer.len() - 1) as f32;
        let delay = delay.clamp(0.0, max);
        let whole = delay.floor();
        let frac = delay - whole;
        let whole = whole as usize;

        let a = self.read_at(whole);
        let b = self.read_at((whole + 1).min(self.buffer.len() - 1));
        a + (b - a) * frac
    }

    /// Write `sample` and return the sample from `delay()` samples earlier.
    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        self.write(sample);
        self.read()
    }

    /// Delay a whole block in place.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
