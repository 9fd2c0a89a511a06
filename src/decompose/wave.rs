use std::fmt;

use serde::Serialize;

/// One detected presence interval of a base frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Wave {
    frequency: f64,
    confidence: f64,
    start_idx: usize,
    length: usize,
}

impl Wave {
    /// Confidence is clamped into `[0, 1]`; NaN reads as 0.
    pub fn new(frequency: f64, confidence: f64, start_idx: usize, length: usize) -> Self {
        Self {
            frequency,
            confidence: clamp_confidence(confidence),
            start_idx,
            length,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn start_idx(&self) -> usize {
        self.start_idx
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// One past the last sample covered.
    pub fn end_idx(&self) -> usize {
        self.start_idx + self.length
    }

    /// Span covering both waves, confidence averaged.
    pub fn merged(&self, other: &Wave) -> Wave {
        let start = self.start_idx.min(other.start_idx);
        let end = self.end_idx().max(other.end_idx());
        Wave::new(
            self.frequency,
            (self.confidence + other.confidence) / 2.0,
            start,
            end - start,
        )
    }
}

impl fmt::Display for Wave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frequency {} confidence {:.3} samples [{}, {}) length {}",
            self.frequency,
            self.confidence,
            self.start_idx,
            self.end_idx(),
            self.length
        )
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Waves of every probed frequency, grouped per frequency in probe order and
/// sorted by start within each group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WaveDecomposition {
    waves: Vec<Wave>,
}

impl WaveDecomposition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frequency(&mut self, waves: Vec<Wave>) {
        self.waves.extend(waves);
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    pub fn for_frequency(&self, frequency: f64) -> impl Iterator<Item = &Wave> {
        self.waves.iter().filter(move |w| w.frequency == frequency)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Wave> {
        self.waves.iter()
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn into_vec(self) -> Vec<Wave> {
        self.waves
    }
}

impl<'a> IntoIterator for &'a WaveDecomposition {
    type Item = &'a Wave;
    type IntoIter = std::slice::Iter<'a, Wave>;

    fn into_iter(self) -> Self::IntoIter {
        self.waves.iter()
    }
}

impl FromIterator<Vec<Wave>> for WaveDecomposition {
    fn from_iter<I: IntoIterator<Item = Vec<Wave>>>(iter: I) -> Self {
        let mut decomposition = Self::new();
        for waves in iter {
            decomposition.push_frequency(waves);
        }
        decomposition
    }
}
