use crate::{
    dsp::{
        envelope::Envelope,
        oscillator::{Oscillator, WavetableSource},
        smoother::{OnePoleSmoother, Smoother, Smoothing},
        EnvelopeState,
    },
    synth::message::{MessageReceiver, SynthMessage},
    Result, SynthConfig, MAX_BLOCK_SIZE,
};

/// One monophonic voice: a unison oscillator shaped by an amplitude
/// envelope, with smoothed pitch and volume.
pub struct Voice {
    config: SynthConfig,
    oscillator: Oscillator,
    envelope: Envelope,
    frequency: Smoother,
    volume: OnePoleSmoother,
    velocity: f32,
    frequencies: Vec<f32>,
    gains: Vec<f32>,
}

impl Voice {
    pub fn new(
        config: &SynthConfig,
        source: impl Into<WavetableSource>,
        envelope: Envelope,
    ) -> Result<Self> {
        config.validate()?;

        let mut oscillator = Oscillator::new().with_wavetable(source);
        oscillator.set_phase_spread(config.unison_phase_spread);
        oscillator.set_unison_number(config.unison_number)?;
        oscillator.set_unison_spread(config.unison_spread);
        oscillator.set_unison_noise(config.unison_noise);

        Ok(Self {
            config: *config,
            oscillator,
            envelope,
            frequency: Smoother::new(config.smoothing_samples, 0.0),
            volume: OnePoleSmoother::new(config.smoothing_samples, 1.0),
            velocity: 0.0,
            frequencies: vec![0.0; MAX_BLOCK_SIZE],
            gains: vec![0.0; MAX_BLOCK_SIZE],
        })
    }

    pub fn handle_message(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn {
                frequency,
                velocity,
            } => {
                let target = self.config.normalize(frequency);
                if !self.is_active() {
                    // A fresh note starts at pitch instead of gliding
                    self.frequency.reset(target);
                    self.oscillator.reset();
                } else {
                    self.frequency.set_value(target);
                }
                self.velocity = velocity.clamp(0.0, 1.0);
                self.envelope.prepare();
            }
            SynthMessage::NoteOff => self.envelope.release(),
            SynthMessage::SetFrequency(frequency) => {
                self.frequency.set_value(self.config.normalize(frequency));
            }
            SynthMessage::SetVolume(volume) => self.volume.set_value(volume.max(0.0)),
            SynthMessage::SetUnisonNumber(count) => {
                self.oscillator.set_unison_number_clamped(count);
            }
            SynthMessage::SetUnisonSpread(spread) => self.oscillator.set_unison_spread(spread),
            SynthMessage::SetUnisonNoise(noise) => self.oscillator.set_unison_noise(noise),
            SynthMessage::Reset => {
                self.envelope.reset();
                self.oscillator.reset();
            }
        }
    }

    /// Apply pending messages, then render.
    pub fn process(&mut self, receiver: &mut impl MessageReceiver, out: &mut [f32]) {
        while let Some(message) = receiver.pop() {
            self.handle_message(message);
        }
        self.render(out);
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        if !self.is_active() {
            out.fill(0.0);
            return;
        }

        let frequencies = &mut self.frequencies[..out.len()];
        let gains = &mut self.gains[..out.len()];

        self.frequency.fill(frequencies);
        self.oscillator.fill_modulated(out, frequencies);

        self.envelope.fill(gains);
        self.volume.multiply(gains);
        for (sample, gain) in out.iter_mut().zip(gains.iter()) {
            *sample *= gain * self.velocity;
        }
    }

    /// Whether the envelope is still producing sound.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.envelope.state(),
            EnvelopeState::Idle | EnvelopeState::Finished
        )
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    /// Smoothed pitch, normalized.
    pub fn frequency(&self) -> f32 {
        self.frequency.current()
    }
}
