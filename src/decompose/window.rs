use std::ops::Range;

/// Half-open index range `[lower, upper)` into a sample sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub lower: usize,
    pub upper: usize,
}

impl Window {
    pub fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }

    pub fn len(&self) -> usize {
        self.upper.saturating_sub(self.lower)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.lower..self.upper
    }

    pub fn view<'a>(&self, samples: &'a [f64]) -> &'a [f64] {
        &samples[self.lower.min(samples.len())..self.upper.min(samples.len())]
    }
}

/// Splits `len` samples into windows of `width`, each shifted by `stride`
/// from the previous one. A sequence no longer than one window becomes a single
/// whole-sequence window; an empty one yields none.
pub fn split_to_windows(len: usize, width: usize, stride: usize) -> Vec<Window> {
    if len == 0 {
        return Vec::new();
    }
    if len <= width || width == 0 {
        return vec![Window::new(0, len)];
    }

    let stride = stride.max(1);
    (0..=len - width)
        .step_by(stride)
        .map(|lower| Window::new(lower, lower + width))
        .collect()
}

/// Arithmetic mean, zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
