//! Demo runner: one voice on the audio thread, a control loop editing the
//! wave on the main thread, and a `WaveComputer` in between.

use std::thread;
use std::time::{Duration, Instant};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};
use rtrb::{Producer, RingBuffer};

use wavesynth::{
    dsp::{envelope::Envelope, wave::Wave},
    engine::WaveComputer,
    synth::{SynthMessage, Voice},
    SynthConfig, MAX_BLOCK_SIZE,
};

// C3, Eb3, F3, G3
const NOTES: [f32; 4] = [130.81, 155.56, 174.61, 196.0];
const NOTE_LENGTH: Duration = Duration::from_millis(400);
const NOTE_GAP: Duration = Duration::from_millis(100);

/// Demo builder
pub struct Demo {
    seconds: f32,
    harmonics: usize,
    unison: (usize, f32, f32),
}

impl Demo {
    pub fn new() -> Self {
        Self {
            seconds: 10.0,
            harmonics: 8,
            unison: (1, 0.0, 0.0),
        }
    }

    /// How long to play for
    pub fn seconds(mut self, seconds: f32) -> Self {
        self.seconds = seconds;
        self
    }

    /// Number of partials the control loop sweeps through
    pub fn harmonics(mut self, harmonics: usize) -> Self {
        self.harmonics = harmonics.max(1);
        self
    }

    /// Unison voice count, detune spread and detune noise
    pub fn unison(mut self, number: usize, spread: f32, noise: f32) -> Self {
        self.unison = (number, spread, noise);
        self
    }

    /// Run the demo (blocks until done)
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!("sample rate {sample_rate} Hz, {channels} channels");

        let (number, spread, noise) = self.unison;
        let synth_config = SynthConfig::new()
            .with_sample_rate(sample_rate)
            .with_unison(number, spread, noise)
            .with_unison_phase_spread(1.0);
        synth_config
            .validate()
            .wrap_err("invalid synth settings")?;

        // Background recompute, reporting each published generation
        let (published, generations) = crossbeam::channel::unbounded();
        let computer = WaveComputer::new(&synth_config, published)
            .wrap_err("failed to start wave computer")?;

        let mut wave = Wave::sine().with_harmonics(&[1.0]);
        emphasize(&mut wave, self.harmonics, 1);
        computer.update(wave.clone());

        let envelope = Envelope::adsr(
            synth_config.samples(0.01),
            synth_config.samples(0.2),
            0.7,
            synth_config.samples(0.3),
        );
        let mut voice = Voice::new(&synth_config, computer.reader(), envelope)
            .wrap_err("failed to build voice")?;

        let (mut tx, mut rx) = RingBuffer::<SynthMessage>::new(64);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames];
                    voice.process(&mut rx, block);

                    // Mono to all channels
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }
                    frames_written += frames;
                }
            },
            |err| error!("audio error: {err}"),
            None,
        )?;
        stream.play()?;

        info!("playing for {} seconds", self.seconds);
        let start = Instant::now();
        let mut step = 0;
        while start.elapsed().as_secs_f32() < self.seconds {
            emphasize(&mut wave, self.harmonics, step % self.harmonics + 1);
            let generation = computer.update(wave.clone());
            info!("requested generation {generation}");

            send(
                &mut tx,
                SynthMessage::NoteOn {
                    frequency: NOTES[step % NOTES.len()],
                    velocity: 0.8,
                },
            );
            thread::sleep(NOTE_LENGTH);
            send(&mut tx, SynthMessage::NoteOff);
            thread::sleep(NOTE_GAP);

            for generation in generations.try_iter() {
                info!("published generation {generation}");
            }
            step += 1;
        }

        drop(stream);
        Ok(())
    }
}

impl Default for Demo {
    fn default() -> Self {
        Self::new()
    }
}

/// Boost harmonic `focus` to full level, the rest fall off as 1/2n.
fn emphasize(wave: &mut Wave, harmonics: usize, focus: usize) {
    for number in 1..=harmonics {
        let amplitude = if number == focus {
            1.0
        } else {
            0.5 / number as f32
        };
        wave.set_harmonic(number, amplitude, 0.0);
    }
}

fn send(tx: &mut Producer<SynthMessage>, message: SynthMessage) {
    if tx.push(message).is_err() {
        warn!("control queue full, dropped {message:?}");
    }
}
