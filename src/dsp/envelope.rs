use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Breakpoint Envelope
===================

A list of breakpoints, each a value and the number of samples it takes to
glide to the next one. Output is a straight line between consecutive
breakpoints. One breakpoint may be marked as the sustain point: the envelope
stops there and holds its value until `release()`.

    value
      1.0 ┤   ╱╲
          │  ╱  ╲
      0.6 ┤ ╱    ╲__________ (held)
          │╱                ╲
      0.0 ┼──────────────────╲──→ samples
          p0  p1   p2        p2→p3 after release

Vocabulary
----------

  point         (value, samples). `samples` is the length of the segment
                that starts at this point; the last point's length is unused.

  phase         Index of the breakpoint whose segment is playing.

  sustain       The envelope is parked on the sustain point.


The State Machine
-----------------

    Idle ──prepare()──→ Running ──reach sustain──→ Held
                          │                         │
                          │ release()               │ release()
                          ↓                         ↓
                        Releasing ←─────────────────┘
                          │
                          └──reach last point──→ Finished

`prepare()` starts at phase 0 and goes straight to Held if phase 0 is the
sustain point. An envelope without a sustain point runs from first to last
point on its own.

Release never jumps: the value at the release instant becomes the start of
the segment leaving the sustain point. Releasing before the sustain point
is reached skips ahead to it, starting from wherever the ramp currently is.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub value: f32,
    /// Samples to reach the next point.
    pub samples: usize,
}

impl Point {
    pub fn new(value: f32, samples: usize) -> Self {
        Self { value, samples }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Running,
    Held,
    Releasing,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    points: Vec<Point>,
    sustain_point: Option<usize>,

    active: bool,
    phase: usize,
    phase_sample: usize,
    segment_samples: usize,
    from_value: f32,
    sustain: bool,
    released: bool,
}

impl Envelope {
    pub fn new(points: Vec<Point>, sustain_point: Option<usize>) -> Result<Self> {
        validate(&points, sustain_point)?;
        Ok(Self {
            points,
            sustain_point,
            active: false,
            phase: 0,
            phase_sample: 0,
            segment_samples: 0,
            from_value: 0.0,
            sustain: false,
            released: false,
        })
    }

    /// Classic attack/decay/sustain/release shape, durations in samples.
    pub fn adsr(attack: usize, decay: usize, sustain_level: f32, release: usize) -> Self {
        let points = vec![
            Point::new(0.0, attack),
            Point::new(1.0, decay),
            Point::new(sustain_level.clamp(0.0, 1.0), release),
            Point::new(0.0, 0),
        ];
        Self {
            points,
            sustain_point: Some(2),
            active: false,
            phase: 0,
            phase_sample: 0,
            segment_samples: 0,
            from_value: 0.0,
            sustain: false,
            released: false,
        }
    }

    /// Replace the breakpoints. Not realtime-safe; call between notes. Resets
    /// the envelope to idle.
    pub fn set_points(&mut self, points: Vec<Point>, sustain_point: Option<usize>) -> Result<()> {
        validate(&points, sustain_point)?;
        self.points = points;
        self.sustain_point = sustain_point;
        self.reset();
        Ok(())
    }

    pub fn set_sustain_point(&mut self, sustain_point: Option<usize>) -> Result<()> {
        validate(&self.points, sustain_point)?;
        self.sustain_point = sustain_point;
        Ok(())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn sustain_point(&self) -> Option<usize> {
        self.sustain_point
    }

    /// Start from the first breakpoint.
    pub fn prepare(&mut self) {
        self.active = true;
        self.released = false;
        self.sustain = false;
        self.enter_phase(0);
    }

    /// Leave the sustain point (or head for it if not there yet).
    pub fn release(&mut self) {
        if !self.active || self.released {
            return;
        }

        let current = self.value();
        self.released = true;
        self.sustain = false;

        let last = self.points.len() - 1;
        if self.phase >= last {
            return;
        }

        match self.sustain_point {
            Some(sustain) if self.phase <= sustain => {
                self.phase = sustain;
                self.phase_sample = 0;
                self.from_value = current;
                self.segment_samples = self.points[sustain].samples;
                if sustain < last && self.segment_samples == 0 {
                    self.enter_phase(sustain + 1);
                }
            }
            _ => {
                // Past the sustain point: finish this segment from here
                let remaining = self.segment_samples - self.phase_sample;
                self.from_value = current;
                self.phase_sample = 0;
                self.segment_samples = remaining.max(1);
            }
        }
    }

    /// Back to idle; output is silent until the next `prepare()`.
    pub fn reset(&mut self) {
        self.active = false;
        self.released = false;
        self.sustain = false;
        self.phase = 0;
        self.phase_sample = 0;
        self.segment_samples = 0;
        self.from_value = 0.0;
    }

    /// Render the next `buffer.len()` envelope values.
    pub fn fill(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }

        let out = self.value();
        if !self.sustain && self.phase < self.points.len() - 1 {
            self.phase_sample += 1;
            if self.phase_sample >= self.segment_samples {
                self.enter_phase(self.phase + 1);
            }
        }
        out
    }

    /// Value at the current position, i.e. the next sample `fill()` produces.
    pub fn value(&self) -> f32 {
        if !self.active {
            return 0.0;
        }
        if self.sustain || self.phase >= self.points.len() - 1 {
            return self.from_value;
        }
        let target = self.points[self.phase + 1].value;
        let t = self.phase_sample as f32 / self.segment_samples as f32;
        self.from_value + (target - self.from_value) * t
    }

    pub fn released(&self) -> bool {
        self.released
    }

    pub fn finished(&self) -> bool {
        self.active && !self.sustain && self.phase >= self.points.len() - 1
    }

    pub fn state(&self) -> EnvelopeState {
        if !self.active {
            EnvelopeState::Idle
        } else if self.finished() {
            EnvelopeState::Finished
        } else if self.sustain {
            EnvelopeState::Held
        } else if self.released {
            EnvelopeState::Releasing
        } else {
            EnvelopeState::Running
        }
    }

    fn enter_phase(&mut self, phase: usize) {
        let last = self.points.len() - 1;
        let mut phase = phase.min(last);
        loop {
            self.phase = phase;
            self.phase_sample = 0;
            self.from_value = self.points[phase].value;
            self.segment_samples = self.points[phase].samples;

            if !self.released && self.sustain_point == Some(phase) {
                self.sustain = true;
                return;
            }
            // Zero-length segments are skipped
            if phase >= last || self.segment_samples > 0 {
                return;
            }
            phase += 1;
        }
    }
}

fn validate(points: &[Point], sustain_point: Option<usize>) -> Result<()> {
    if points.is_empty() {
        return Err(Error::EmptyEnvelope);
    }
    match sustain_point {
        Some(sustain) if sustain >= points.len() => Err(Error::SustainOutOfRange {
            sustain,
            points: points.len(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_step(values: &[f32]) -> f32 {
        values
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn one_shot_runs_exactly_its_length() {
        let points = vec![
            Point::new(0.0, 10),
            Point::new(1.0, 20),
            Point::new(0.5, 30),
            Point::new(0.0, 0),
        ];
        let mut env = Envelope::new(points, None).unwrap();
        env.prepare();

        let mut buffer = vec![0.0f32; 59];
        env.fill(&mut buffer);
        assert!(!env.finished());

        let mut last = [0.0f32; 1];
        env.fill(&mut last);
        assert!(env.finished());
        assert_eq!(env.state(), EnvelopeState::Finished);

        // Steepest segment is 0 -> 1 over 10 samples
        buffer.push(last[0]);
        assert!(max_step(&buffer) <= 0.1 + 1e-6);
        assert_eq!(buffer[0], 0.0);
        assert_eq!(buffer[10], 1.0);
        assert_eq!(buffer[30], 0.5);
    }

    #[test]
    fn holds_at_sustain_point() {
        let mut env = Envelope::adsr(10, 10, 0.6, 20);
        env.prepare();

        let mut buffer = vec![0.0f32; 64];
        env.fill(&mut buffer);

        assert_eq!(env.state(), EnvelopeState::Held);
        assert!(!env.finished());
        assert!(buffer[20..].iter().all(|&v| (v - 0.6).abs() < 1e-6));
    }

    #[test]
    fn release_from_sustain_is_continuous() {
        let mut env = Envelope::adsr(10, 10, 0.6, 20);
        env.prepare();

        let mut buffer = vec![0.0f32; 100];
        env.fill(&mut buffer[..40]);
        env.release();
        assert!(env.released());
        assert_eq!(env.state(), EnvelopeState::Releasing);
        env.fill(&mut buffer[40..]);

        // Release ramp is 0.6 over 20 samples
        assert!((buffer[40] - buffer[39]).abs() <= 0.03 + 1e-6);
        assert!(max_step(&buffer[30..]) <= 0.03 + 1e-6);
        assert!(env.finished());
        assert_eq!(buffer[99], 0.0);
    }

    #[test]
    fn release_during_attack_does_not_jump() {
        let mut env = Envelope::adsr(100, 10, 0.6, 50);
        env.prepare();

        let mut before = vec![0.0f32; 30];
        env.fill(&mut before);
        let at_release = env.value();
        env.release();
        assert!((env.value() - at_release).abs() < 1e-6);

        let mut after = vec![0.0f32; 60];
        env.fill(&mut after);
        assert!((after[0] - before[29]).abs() <= 0.01 + 1e-6);
        assert!(after[0] > after[10]);
        assert!(env.finished());
    }

    #[test]
    fn sustain_at_first_point_holds_immediately() {
        let points = vec![Point::new(0.3, 10), Point::new(0.0, 0)];
        let mut env = Envelope::new(points, Some(0)).unwrap();
        env.prepare();
        assert_eq!(env.state(), EnvelopeState::Held);

        let mut buffer = [0.0f32; 8];
        env.fill(&mut buffer);
        assert!(buffer.iter().all(|&v| v == 0.3));
    }

    #[test]
    fn sustain_on_last_point_finishes_on_release() {
        let points = vec![Point::new(0.0, 4), Point::new(1.0, 0)];
        let mut env = Envelope::new(points, Some(1)).unwrap();
        env.prepare();
        let mut buffer = [0.0f32; 8];
        env.fill(&mut buffer);
        assert!(!env.finished());
        env.release();
        assert!(env.finished());
        assert_eq!(env.next_sample(), 1.0);
    }

    #[test]
    fn idle_is_silent() {
        let mut env = Envelope::adsr(10, 10, 0.5, 10);
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert!(!env.finished());
        let mut buffer = [1.0f32; 4];
        env.fill(&mut buffer);
        assert_eq!(buffer, [0.0; 4]);
    }

    #[test]
    fn rejects_bad_sustain_point() {
        let points = vec![Point::new(0.0, 4), Point::new(1.0, 0)];
        assert!(matches!(
            Envelope::new(points.clone(), Some(2)),
            Err(Error::SustainOutOfRange { sustain: 2, points: 2 })
        ));
        assert!(matches!(Envelope::new(Vec::new(), None), Err(Error::EmptyEnvelope)));

        let mut env = Envelope::new(points, None).unwrap();
        assert!(env.set_sustain_point(Some(5)).is_err());
        assert!(env.set_sustain_point(Some(1)).is_ok());
    }
}
