use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{Pulses, SineBehaviour, SineSignal};
use crate::spectral::frequency_to_period;

/// Uniform noise added on top of a generated signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Noise {
    /// Peak noise as a fraction of the signal's largest absolute amplitude.
    pub level: f64,
    pub seed: u64,
}

impl Noise {
    pub const DEFAULT_LEVEL: f64 = 0.15;

    pub fn new(level: f64, seed: u64) -> Self {
        Self { level, seed }
    }
}

/// Value of `signal` at `index`; zero when disabled or past the behaviour record.
pub fn sine_value(signal: &SineSignal, index: usize) -> f64 {
    let Some(behaviour) = signal.behaviour.get(index) else {
        return 0.0;
    };
    if !behaviour.enabled {
        return 0.0;
    }

    let sine = &signal.sine;
    behaviour.volume_level * (index as f64 / sine.freq_factor + sine.start_phase).sin()
}

/// Sums the base signals sample by sample, optionally adding noise.
pub fn generate(length: usize, base_signals: &[SineSignal], noise: Option<Noise>) -> Vec<f64> {
    let mut samples: Vec<f64> = (0..length)
        .map(|i| base_signals.iter().map(|s| sine_value(s, i)).sum())
        .collect();

    if let Some(noise) = noise {
        let peak = samples.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        let spread = (peak * noise.level).abs();
        if spread > 0.0 && spread.is_finite() {
            let distribution = Uniform::new_inclusive(-spread, spread);
            let mut rng = StdRng::seed_from_u64(noise.seed);
            for sample in samples.iter_mut() {
                *sample += distribution.sample(&mut rng);
            }
        }
    }

    log::debug!(
        "Generated {} samples from {} base signals (noise: {})",
        length,
        base_signals.len(),
        noise.map_or("off".to_string(), |n| format!("{:.0}%", n.level * 100.0))
    );
    samples
}

/// Uniform noise in `[-amplitude, amplitude]` with no underlying tone.
pub fn white_noise(length: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let amplitude = amplitude.abs();
    if amplitude == 0.0 || !amplitude.is_finite() {
        return vec![0.0; length];
    }

    let distribution = Uniform::new_inclusive(-amplitude, amplitude);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..length).map(|_| distribution.sample(&mut rng)).collect()
}

/// Per-sample values of one base signal plus its on/off mask (1.0 / 0.0).
pub fn base_signal_values(signal: &SineSignal) -> (Vec<f64>, Vec<f64>) {
    signal
        .behaviour
        .iter()
        .enumerate()
        .map(|(i, b)| (sine_value(signal, i), if b.enabled { 1.0 } else { 0.0 }))
        .unzip()
}

/// Three-component demo signal: a pulsed tone at factor 5 with rising volume,
/// a pulsed tone at factor 2 with falling volume, and a quiet constant tone at
/// factor 10.
pub fn demo_base_signals(length: usize) -> Vec<SineSignal> {
    let p5 = frequency_to_period(5.0);
    let p2 = frequency_to_period(2.0);

    let rising = SineSignal::new(5.0, FRAC_PI_2, length).pulses(&Pulses {
        first: 0,
        on: 10 * p5,
        cycle: 20 * p5,
        volumes: vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0],
    });
    let falling = SineSignal::new(2.0, -FRAC_PI_4, length).pulses(&Pulses {
        first: 5 * p2,
        on: 10 * p2,
        cycle: 15 * p2,
        volumes: vec![3.0, 2.4, 1.8, 1.2, 0.6],
    });
    let steady = SineSignal::new(10.0, 0.0, length).enable(0, length, SineBehaviour::VOLUME_MIN);

    vec![rising, falling, steady]
}
