use super::window::{split_to_windows, Window};
use crate::config::AnalysisConfig;
use crate::error::{DecomposeError, Result};
use crate::spectral::filter::{Framing, FrequencyFilter};
use crate::spectral::{frequency_to_period, median, validate_frequency};

/// Presence strength of one frequency, one value per window position.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceSeries {
    pub frequency: f64,
    pub period: usize,
    /// Samples per window: `window_periods` periods, or the whole signal when
    /// it is shorter.
    pub window_width: usize,
    pub stride: usize,
    pub signal_len: usize,
    pub values: Vec<f64>,
    /// Median broadband noise reading across windows, on the scale of `values`.
    pub noise_floor: f64,
}

impl PresenceSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn window_start(&self, index: usize) -> usize {
        index * self.stride
    }

    /// Signal samples covered by a run of series indices.
    ///
    /// Each series point stands for the centre of its window. Runs reaching
    /// the first or last window extend to the signal boundary.
    pub fn signal_span(&self, run: Window) -> Window {
        if run.is_empty() || self.is_empty() {
            return Window::new(0, 0);
        }

        let half = self.window_width / 2;
        let lower = if run.lower == 0 {
            0
        } else {
            (self.window_start(run.lower) + half).min(self.signal_len)
        };
        let upper = if run.upper >= self.values.len() {
            self.signal_len
        } else {
            (self.window_start(run.upper - 1) + half + self.stride).min(self.signal_len)
        };
        Window::new(lower, upper.max(lower))
    }
}

/// Slides a window of `window_periods` periods across `signal` and measures
/// how strongly `frequency` is expressed in each position.
///
/// Every window is weighted by the configured taper, zero-padded to
/// `padding_periods` times its length and read against a reference tone
/// framed the same way. A window never outgrows the signal; a layout whose
/// padded length does not fit in memory fails with `WindowTooLarge`.
pub fn probe(
    signal: &[f64],
    frequency: f64,
    config: &AnalysisConfig,
    filter: &mut FrequencyFilter<'_>,
) -> Result<PresenceSeries> {
    validate_frequency(frequency)?;

    let period = frequency_to_period(frequency);
    let stride = config.stride.max(1);
    let width = period.saturating_mul(config.window_periods.max(1));
    let windows = split_to_windows(signal.len(), width, stride);
    let window_width = windows.first().map_or(0, Window::len);
    log::trace!(
        "Frequency {}: window size = {} samples, {} windows",
        frequency,
        window_width,
        windows.len()
    );

    let padding = config.padding_periods.max(1);
    let analysis_len = window_width
        .checked_mul(padding)
        .filter(|&len| len <= isize::MAX as usize / std::mem::size_of::<f64>())
        .ok_or(DecomposeError::WindowTooLarge {
            frequency,
            width: window_width,
            padding,
        })?;
    let framing = Framing::new(window_width, config.taper);
    let weights = framing.weights();

    let mut padded = vec![0.0; analysis_len];
    let mut values = Vec::with_capacity(windows.len());
    let mut noise = Vec::with_capacity(windows.len());
    for window in &windows {
        let view = window.view(signal);
        for ((slot, &sample), &weight) in padded.iter_mut().zip(view).zip(&weights) {
            *slot = sample * weight;
        }
        padded[view.len()..].fill(0.0);

        let presence = filter.presence(&padded, frequency, framing)?;
        values.push(presence.amplitude);
        noise.push(presence.noise);
    }

    if config.smoothing {
        values = moving_average(&values, period.div_ceil(stride));
    }
    let noise_floor = median(&mut noise);
    log::trace!("Frequency {}: noise floor {:.4}", frequency, noise_floor);

    Ok(PresenceSeries {
        frequency,
        period,
        window_width,
        stride,
        signal_len: signal.len(),
        values,
        noise_floor,
    })
}

/// Centered moving average over `span` points, truncated at both ends.
pub fn moving_average(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || span <= 1 {
        return values.to_vec();
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for value in values {
        prefix.push(prefix[prefix.len() - 1] + value);
    }

    let half = span / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = i.saturating_add(half).saturating_add(1).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{generate, white_noise, SineSignal};
    use crate::spectral::filter::ReferenceTones;
    use approx::assert_abs_diff_eq;

    fn raw() -> AnalysisConfig {
        AnalysisConfig {
            smoothing: false,
            ..AnalysisConfig::default()
        }
    }

    fn run(signal: &[f64], frequency: f64, config: &AnalysisConfig) -> PresenceSeries {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        probe(signal, frequency, config, &mut filter).unwrap()
    }

    #[test]
    fn one_value_per_window_start() {
        let signal = vec![0.0; 300];
        let series = run(&signal, 5.0, &raw());
        assert_eq!(series.period, 31);
        assert_eq!(series.window_width, 124);
        assert_eq!(series.len(), 177);

        let strided = run(&signal, 5.0, &AnalysisConfig { stride: 10, ..raw() });
        assert_eq!(strided.len(), 18);
        assert_eq!(strided.window_start(17), 170);

        let single = run(&signal, 5.0, &AnalysisConfig { window_periods: 1, ..raw() });
        assert_eq!(single.window_width, 31);
        assert_eq!(single.len(), 270);
    }

    #[test]
    fn steady_tone_reads_its_volume() {
        let base = [SineSignal::new(5.0, 0.7, 400).enable(0, 400, 1.5)];
        let signal = generate(400, &base, None);
        let series = run(&signal, 5.0, &raw());
        for &value in &series.values {
            assert!((value - 1.5).abs() < 0.1, "presence {value}");
        }
    }

    #[test]
    fn silence_reads_zero() {
        let series = run(&vec![0.0; 200], 2.0, &AnalysisConfig::default());
        assert!(series.values.iter().all(|&v| v == 0.0));
        assert_eq!(series.noise_floor, 0.0);
    }

    #[test]
    fn noise_floor_follows_noise_level() {
        let quiet = run(&white_noise(600, 0.1, 4), 5.0, &raw());
        let loud = run(&white_noise(600, 1.0, 4), 5.0, &raw());
        assert!(quiet.noise_floor > 0.0);
        assert_abs_diff_eq!(loud.noise_floor / quiet.noise_floor, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn huge_factors_read_absent_without_allocating() {
        let signal = vec![0.5; 100];
        for frequency in [1e9, 1e18, 1e300] {
            let series = run(&signal, frequency, &AnalysisConfig::default());
            assert_eq!(series.window_width, 100);
            assert_eq!(series.len(), 1);
            assert_eq!(series.values, vec![0.0]);
        }
    }

    #[test]
    fn oversized_padding_is_an_error() {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        let config = AnalysisConfig { padding_periods: usize::MAX, ..raw() };
        let err = probe(&vec![0.5; 100], 5.0, &config, &mut filter).unwrap_err();
        assert!(matches!(err, DecomposeError::WindowTooLarge { width: 100, .. }));
    }

    #[test]
    fn hann_window_ignores_a_loud_neighbour() {
        let base = [SineSignal::new(2.0, 0.0, 600).enable(0, 600, 3.0)];
        let signal = generate(600, &base, None);
        for frequency in [3.0, 5.0, 10.0] {
            let series = run(&signal, frequency, &raw());
            let peak = series.values.iter().copied().fold(0.0, f64::max);
            assert!(peak < 0.15, "frequency {frequency} reads {peak}");
        }
    }

    #[test]
    fn short_signal_is_one_padded_window() {
        let base = [SineSignal::new(5.0, 0.0, 20).enable(0, 20, 1.0)];
        let signal = generate(20, &base, None);
        let series = run(&signal, 5.0, &raw());
        assert_eq!(series.len(), 1);
        assert_eq!(series.window_width, 20);
        assert!(series.values[0] > 0.0);
        assert!(run(&[], 5.0, &raw()).is_empty());
    }

    #[test]
    fn padding_keeps_the_scale() {
        let base = [SineSignal::new(2.0, 0.3, 200).enable(0, 200, 1.0)];
        let signal = generate(200, &base, None);
        let plain = run(&signal, 2.0, &raw());
        let padded = run(&signal, 2.0, &AnalysisConfig { padding_periods: 4, ..raw() });
        assert_eq!(plain.len(), padded.len());
        for (a, b) in plain.values.iter().zip(&padded.values) {
            assert!((a - b).abs() < 0.15, "{a} vs {b}");
        }
    }

    #[test]
    fn rejects_invalid_frequency() {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        assert!(probe(&[0.0; 10], 0.0, &raw(), &mut filter).is_err());
    }

    #[test]
    fn moving_average_is_centered() {
        let smoothed = moving_average(&[0.0, 0.0, 3.0, 0.0, 0.0], 3);
        assert_eq!(smoothed, vec![0.0, 1.0, 1.0, 1.0, 0.0]);
        let edges = moving_average(&[2.0, 4.0], 5);
        assert_abs_diff_eq!(edges[0], 3.0);
        assert_abs_diff_eq!(edges[1], 3.0);
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn span_snaps_to_signal_edges() {
        let series = PresenceSeries {
            frequency: 5.0,
            period: 31,
            window_width: 31,
            stride: 1,
            signal_len: 130,
            values: vec![1.0; 100],
            noise_floor: 0.0,
        };
        assert_eq!(series.signal_span(Window::new(0, 100)), Window::new(0, 130));
        assert_eq!(series.signal_span(Window::new(10, 20)), Window::new(25, 35));
    }
}
