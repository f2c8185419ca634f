//! Test-signal sources. They ignore their input block and generate into the output.

use crate::error::ProcessStatus;
use crate::processor::Processor;
use std::f32::consts::PI;

/// Generates a sine wave at the given frequency. Phase is carried across process() calls for continuity.
#[derive(Clone, Debug, PartialEq)]
pub struct SineGenerator {
    /// Frequency in Hz (e.g. 440.0).
    pub frequency_hz: f32,
    /// Sample rate in Hz (e.g. 48_000).
    pub sample_rate: u32,
    /// Peak amplitude.
    pub amplitude: f32,
    /// Phase in [0.0, 1.0). Advance by frequency_hz / sample_rate per sample; wrap at 1.0.
    pub phase: f32,
}

impl SineGenerator {
    /// Creates a full-scale sine generator. Phase starts at 0.0.
    pub fn new(frequency_hz: f32, sample_rate: u32) -> Self {
        Self {
            frequency_hz,
            sample_rate,
            amplitude: 1.0,
            phase: 0.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }
}

impl Processor for SineGenerator {
    fn process(&mut self, _input: &[f32], output: &mut [f32]) -> ProcessStatus {
        let step = self.frequency_hz / self.sample_rate as f32;
        for sample in output.iter_mut() {
            *sample = self.amplitude * f32::sin(2.0 * PI * self.phase);
            self.phase = (self.phase + step) % 1.0;
        }
        ProcessStatus::Processed
    }
}

/// Emits a block of `level` on one chosen tick and silence on every other tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ImpulseGenerator {
    pub level: f32,
    /// Tick (0-based) on which the impulse block is emitted.
    pub at_tick: u64,
    tick: u64,
}

impl ImpulseGenerator {
    pub fn new(level: f32, at_tick: u64) -> Self {
        Self { level, at_tick, tick: 0 }
    }
}

impl Processor for ImpulseGenerator {
    fn process(&mut self, _input: &[f32], output: &mut [f32]) -> ProcessStatus {
        let value = if self.tick == self.at_tick { self.level } else { 0.0 };
        output.fill(value);
        self.tick += 1;
        ProcessStatus::Processed
    }
}
