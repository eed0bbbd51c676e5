//! White noise source.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_SEED: AtomicU32 = AtomicU32::new(0x1234_5678);

/// Xorshift pseudo-random generator producing samples in [-1.0, 1.0].
///
/// Each caller owns its own state, so a noise source shared between the audio
/// thread and a background filler never needs synchronization: hand each
/// thread its own `Noise`.
#[derive(Debug, Clone, Copy)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        // Xorshift gets stuck at zero
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// A generator seeded differently from every other `fresh()` one in
    /// this process.
    pub fn fresh() -> Self {
        Self::new(NEXT_SEED.fetch_add(0x9E37_79B9, Ordering::Relaxed))
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Next sample in [-1.0, 1.0].
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let normalized = self.next_u32() as f32 / u32::MAX as f32;
        normalized * 2.0 - 1.0
    }

    pub fn fill(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}
