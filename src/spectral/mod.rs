//! Frequency-domain building blocks: discrete transforms and spectral filters.
//!
//! A frequency factor `f` describes a tone `sin(n / f)`, i.e. an angular
//! frequency of `1/f` radians per sample. Its period is `2π·f` samples and,
//! in a spectrum of `L` bins, it lands on bin `L / (2π·f)`.

pub mod filter;
pub mod transform;

use std::f64::consts::PI;

use crate::error::{DecomposeError, Result};

/// Smallest usable frequency factor: `1/f` reaches π rad/sample (Nyquist).
pub const MIN_FREQUENCY_FACTOR: f64 = 1.0 / PI;

/// Period in samples of one full cycle at `frequency`.
pub fn frequency_to_period(frequency: f64) -> usize {
    ((2.0 * PI * frequency.abs()).round() as usize).max(1)
}

/// Spectrum bin of `frequency` in a spectrum of `width` bins.
pub fn frequency_to_index(frequency: f64, width: usize) -> usize {
    (width as f64 / (2.0 * PI * frequency.abs())).round() as usize
}

pub fn validate_frequency(frequency: f64) -> Result<()> {
    if frequency.is_finite() && frequency.abs() >= MIN_FREQUENCY_FACTOR {
        Ok(())
    } else {
        Err(DecomposeError::InvalidFrequency(frequency))
    }
}

/// Median of `values`, reordering them in place; zero for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
