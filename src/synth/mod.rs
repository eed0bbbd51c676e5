// A playable voice on top of the dsp primitives, driven by control messages.
// Voice allocation is left to the host.

pub mod message;
pub mod voice;

pub use message::{MessageReceiver, SynthMessage};
pub use voice::Voice;
