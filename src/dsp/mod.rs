//! Low-level DSP primitives.
//!
//! Everything here except `Wave` construction is allocation-free and
//! realtime-safe once built, so these types can live inside a voice and be
//! driven from the audio callback.

/// Fixed-capacity circular delay buffer.
pub mod delay;
/// Breakpoint envelope with a sustain/release state machine.
pub mod envelope;
/// White noise source with explicit per-caller state.
pub mod noise;
/// Unison wavetable oscillator.
pub mod oscillator;
/// Ramp and one-pole parameter smoothers.
pub mod smoother;
/// Periodic wave definitions.
pub mod wave;

pub use envelope::EnvelopeState;

/// Wrap a phase into [0, 1).
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase - phase.floor();
    // -1e-9 - floor(-1e-9) rounds to exactly 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}
