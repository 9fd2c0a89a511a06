//! Synthetic composite signals built from sinusoidal base signals.

pub mod generate;

pub use generate::{base_signal_values, demo_base_signals, generate, sine_value, white_noise, Noise};

use crate::error::{DecomposeError, Result};

/// Frequency and phase of a base signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineOption {
    /// Frequency factor: the signal is `sin(n / freq_factor + start_phase)`.
    pub freq_factor: f64,
    pub start_phase: f64,
}

/// How a base signal behaves at one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineBehaviour {
    pub volume_level: f64,
    pub enabled: bool,
}

impl SineBehaviour {
    pub const VOLUME_MIN: f64 = 0.3;
    pub const VOLUME_MAX: f64 = 3.0;

    /// Volume is clamped into `[VOLUME_MIN, VOLUME_MAX]`.
    pub fn new(volume_level: f64, enabled: bool) -> Self {
        Self {
            volume_level: volume_level.clamp(Self::VOLUME_MIN, Self::VOLUME_MAX),
            enabled,
        }
    }

    pub fn on(volume_level: f64) -> Self {
        Self::new(volume_level, true)
    }

    pub fn off() -> Self {
        Self::new(Self::VOLUME_MAX, false)
    }
}

impl Default for SineBehaviour {
    fn default() -> Self {
        Self::off()
    }
}

/// A base signal: one sinusoid plus its per-sample behaviour record.
#[derive(Debug, Clone, PartialEq)]
pub struct SineSignal {
    pub sine: SineOption,
    pub behaviour: Vec<SineBehaviour>,
}

impl SineSignal {
    /// Signal of `length` samples, disabled everywhere until scheduled.
    pub fn new(freq_factor: f64, start_phase: f64, length: usize) -> Self {
        Self {
            sine: SineOption {
                freq_factor,
                start_phase,
            },
            behaviour: vec![SineBehaviour::off(); length],
        }
    }

    /// Enables the signal at `volume` on `[start, end)`, clipped to the record.
    pub fn enable(mut self, start: usize, end: usize, volume: f64) -> Self {
        let end = end.min(self.behaviour.len());
        if start < end {
            self.behaviour[start..end].fill(SineBehaviour::on(volume));
        }
        self
    }

    /// Applies a repeating on/off schedule.
    pub fn pulses(mut self, pulses: &Pulses) -> Self {
        let len = self.behaviour.len();
        if pulses.cycle == 0 || pulses.on == 0 {
            return self;
        }

        let mut volumes = pulses.volumes.iter().copied().cycle();
        let mut start = pulses.first;
        while start < len {
            let volume = volumes.next().unwrap_or(SineBehaviour::VOLUME_MAX);
            let end = (start + pulses.on).min(len);
            self.behaviour[start..end].fill(SineBehaviour::on(volume));
            start += pulses.cycle;
        }
        self
    }
}

/// Repeating schedule: on for `on` samples every `cycle` samples starting at
/// `first`, stepping through `volumes` (wrapping) for successive pulses.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulses {
    pub first: usize,
    pub on: usize,
    pub cycle: usize,
    pub volumes: Vec<f64>,
}

/// Parses samples separated by whitespace, commas or semicolons.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(position, token)| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| DecomposeError::ParseSample {
                    position,
                    value: token.to_string(),
                })
        })
        .collect()
}
