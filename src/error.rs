use thiserror::Error;

/// Precondition violations and resource failures reported by this crate.
///
/// Nothing on the audio thread returns these: realtime paths degrade to
/// silence instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("wavetable size {requested} is below the minimum of {minimum} samples")]
    TableTooSmall { requested: usize, minimum: usize },

    #[error("wavetable tables must hold at least one sample")]
    EmptyTable,

    #[error("table has {actual} samples but the wavetable holds {expected}-sample tables")]
    TableSizeMismatch { expected: usize, actual: usize },

    #[error("table frequency {0} must be finite and within (0, 0.5]")]
    InvalidFrequency(f32),

    #[error("delay of {requested} samples must be below the maximum of {max}")]
    DelayTooLong { requested: usize, max: usize },

    #[error("unison number {0} is outside 1..=10")]
    UnisonOutOfRange(usize),

    #[error("envelope needs at least one breakpoint")]
    EmptyEnvelope,

    #[error("sustain point {sustain} is out of range for {points} breakpoints")]
    SustainOutOfRange { sustain: usize, points: usize },

    #[error("failed to spawn background thread")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("work performer has been stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;
