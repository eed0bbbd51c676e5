#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Control messages sent from a control thread to a [`Voice`](super::voice::Voice).
/// Frequencies are in Hz.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { frequency: f32, velocity: f32 },
    NoteOff,
    /// Glide to a new pitch without retriggering.
    SetFrequency(f32),
    SetVolume(f32),
    SetUnisonNumber(usize),
    SetUnisonSpread(f32),
    SetUnisonNoise(f32),
    /// Stop immediately and silence the voice.
    Reset,
}

/// Non-blocking source of control messages.
pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for crossbeam::channel::Receiver<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.try_recv().ok()
    }
}
