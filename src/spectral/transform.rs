use std::f64::consts::PI;

use rustfft::{num_complex::Complex64, FftPlanner};

/// Complex frequency-domain representation of a sample sequence, one bin per sample.
pub type Spectrum = Vec<Complex64>;

/// Forward/inverse discrete Fourier transforms with the normalization used
/// throughout the crate: the forward transform divides by `N`, the inverse
/// keeps only the real part of the reconstruction.
///
/// Holds an FFT planner so repeated transforms of the same length reuse their
/// plan. Planners are not shared across threads; create one per worker.
pub struct Transformer {
    planner: FftPlanner<f64>,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// `X[k] = Σ x[n]·exp(-i·2π·k·n/N) / N`
    pub fn forward(&mut self, samples: &[f64]) -> Spectrum {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex64> = samples.iter().map(|&s| Complex64::new(s, 0.0)).collect();
        self.planner.plan_fft_forward(n).process(&mut buffer);

        let scale = 1.0 / n as f64;
        for bin in buffer.iter_mut() {
            *bin *= scale;
        }
        buffer
    }

    /// `x[n] = Re Σ X[k]·exp(i·2π·k·n/N)`
    pub fn inverse(&mut self, spectrum: &[Complex64]) -> Vec<f64> {
        let n = spectrum.len();
        if n == 0 {
            return Vec::new();
        }

        let mut buffer = spectrum.to_vec();
        self.planner.plan_fft_inverse(n).process(&mut buffer);
        buffer.into_iter().map(|c| c.re).collect()
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn forward_transform(samples: &[f64]) -> Spectrum {
    Transformer::new().forward(samples)
}

pub fn inverse_transform(spectrum: &[Complex64]) -> Vec<f64> {
    Transformer::new().inverse(spectrum)
}

/// Reconstructs the contribution of a single bin: `Re(X[k]·exp(i·2π·n·k/N))`.
///
/// For a real signal this is half of the harmonic, the other half lives in the
/// mirrored bin `N - k`. A bin outside the spectrum contributes nothing.
pub fn inverse_transform_single(spectrum: &[Complex64], bin: usize) -> Vec<f64> {
    let n = spectrum.len();
    let Some(&value) = spectrum.get(bin) else {
        return vec![0.0; n];
    };

    (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 * bin as f64 / n as f64;
            (value * Complex64::from_polar(1.0, angle)).re
        })
        .collect()
}

/// Full real harmonic at `bin`: the bin itself plus its mirror `N - bin`.
pub fn inverse_transform_harmonic(spectrum: &[Complex64], bin: usize) -> Vec<f64> {
    let n = spectrum.len();
    let mut harmonic = inverse_transform_single(spectrum, bin);
    if n == 0 || bin == 0 || 2 * bin == n || bin >= n {
        return harmonic;
    }

    let mirror = inverse_transform_single(spectrum, n - bin);
    for (value, other) in harmonic.iter_mut().zip(mirror) {
        *value += other;
    }
    harmonic
}

pub fn magnitude_spectrum(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|c| c.norm()).collect()
}

pub fn phase_spectrum(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|c| c.arg()).collect()
}
