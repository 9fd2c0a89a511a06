use serde::{Deserialize, Serialize};

use super::probe::PresenceSeries;
use super::wave::Wave;
use super::window::{mean, Window};
use crate::error::{DecomposeError, Result};
use crate::signal::SineBehaviour;

/// How the cutoff for a presence series is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Absolute cutoff in volume units.
    Fixed { cutoff: f64 },
    /// `ratio × max(series)`.
    RelativeToMax { ratio: f64 },
    /// `max(floor, ratio × max(series), noise_ratio × noise floor)`.
    Adaptive {
        floor: f64,
        ratio: f64,
        #[serde(default = "default_noise_ratio")]
        noise_ratio: f64,
    },
}

impl ThresholdPolicy {
    /// Half the quietest volume a base signal can have.
    pub const DEFAULT_FLOOR: f64 = SineBehaviour::VOLUME_MIN / 2.0;
    pub const DEFAULT_RATIO: f64 = 0.1;
    /// Pure noise stays under four times its median reading.
    pub const DEFAULT_NOISE_RATIO: f64 = 4.0;

    /// Cutoff for `values`, whose broadband noise reads `noise_floor`.
    pub fn cutoff(&self, values: &[f64], noise_floor: f64) -> f64 {
        let peak = values.iter().copied().fold(0.0f64, f64::max);
        match *self {
            ThresholdPolicy::Fixed { cutoff } => cutoff,
            // A silent series has no meaningful relative level.
            ThresholdPolicy::RelativeToMax { .. } if peak <= 0.0 => f64::INFINITY,
            ThresholdPolicy::RelativeToMax { ratio } => ratio * peak,
            ThresholdPolicy::Adaptive { floor, ratio, noise_ratio } => {
                floor.max(ratio * peak).max(noise_ratio * noise_floor)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let params = match *self {
            ThresholdPolicy::Fixed { cutoff } => vec![("cutoff", cutoff)],
            ThresholdPolicy::RelativeToMax { ratio } => vec![("ratio", ratio)],
            ThresholdPolicy::Adaptive { floor, ratio, noise_ratio } => {
                vec![("floor", floor), ("ratio", ratio), ("noise_ratio", noise_ratio)]
            }
        };
        for (name, value) in params {
            if !value.is_finite() || value < 0.0 {
                return Err(DecomposeError::InvalidConfig(format!(
                    "threshold {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Adaptive {
            floor: Self::DEFAULT_FLOOR,
            ratio: Self::DEFAULT_RATIO,
            noise_ratio: Self::DEFAULT_NOISE_RATIO,
        }
    }
}

fn default_noise_ratio() -> f64 {
    ThresholdPolicy::DEFAULT_NOISE_RATIO
}

/// Maximal runs of `values` at or above `cutoff`, as index ranges.
pub fn segment(values: &[f64], cutoff: f64) -> Vec<Window> {
    let mut segments = Vec::new();
    let mut open: Option<usize> = None;

    for (i, &value) in values.iter().enumerate() {
        match (value >= cutoff, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                segments.push(Window::new(start, i));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        segments.push(Window::new(start, values.len()));
    }

    segments
}

/// Narrows `run` to its first and last values reaching half the run's peak.
///
/// A tone switching on or off reads half its volume when the window centre
/// sits on the switch, so the half-peak points mark the edges of the tone.
pub fn trim_to_half_peak(values: &[f64], run: Window) -> Window {
    let slice = &values[run.range()];
    let half = slice.iter().copied().fold(0.0f64, f64::max) / 2.0;
    let first = slice.iter().position(|&v| v >= half);
    let last = slice.iter().rposition(|&v| v >= half);
    match (first, last) {
        (Some(first), Some(last)) => Window::new(run.lower + first, run.lower + last + 1),
        _ => run,
    }
}

/// Thresholds a presence series into candidate waves in signal coordinates,
/// each carrying the mean presence of its trimmed run as confidence.
pub fn candidate_waves(series: &PresenceSeries, policy: &ThresholdPolicy) -> Vec<Wave> {
    let cutoff = policy.cutoff(&series.values, series.noise_floor);
    let runs = segment(&series.values, cutoff);
    log::trace!(
        "Frequency {}: cutoff {:.4}, {} candidate segments",
        series.frequency,
        cutoff,
        runs.len()
    );

    runs.into_iter()
        .map(|run| {
            let run = trim_to_half_peak(&series.values, run);
            let span = series.signal_span(run);
            Wave::new(series.frequency, mean(&series.values[run.range()]), span.lower, span.len())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn finds_maximal_runs() {
        let values = [0.0, 0.6, 0.7, 0.2, 0.5, 0.5, 0.5, 0.1, 0.9];
        let runs = segment(&values, 0.5);
        assert_eq!(
            runs,
            vec![Window::new(1, 3), Window::new(4, 7), Window::new(8, 9)]
        );
    }

    #[test]
    fn no_qualifying_values_means_no_segments() {
        assert!(segment(&[0.1, 0.2, 0.3], 0.5).is_empty());
        assert!(segment(&[], 0.5).is_empty());
    }

    #[test]
    fn policies_choose_cutoffs() {
        let values = [0.2, 2.0, 1.0];
        let adaptive = ThresholdPolicy::Adaptive { floor: 0.15, ratio: 0.1, noise_ratio: 4.0 };
        assert_eq!(ThresholdPolicy::Fixed { cutoff: 0.45 }.cutoff(&values, 1.0), 0.45);
        assert_eq!(ThresholdPolicy::RelativeToMax { ratio: 0.5 }.cutoff(&values, 1.0), 1.0);
        assert_eq!(adaptive.cutoff(&values, 0.0), 0.2);
        assert_eq!(adaptive.cutoff(&[0.5], 0.0), 0.15);
        assert_eq!(adaptive.cutoff(&values, 0.25), 1.0);
        assert_eq!(
            ThresholdPolicy::RelativeToMax { ratio: 0.5 }.cutoff(&[0.0, 0.0], 0.0),
            f64::INFINITY
        );
    }

    #[test]
    fn noise_ratio_defaults_when_omitted() {
        let policy: ThresholdPolicy =
            serde_json::from_str(r#"{"kind": "adaptive", "floor": 0.2, "ratio": 0.1}"#).unwrap();
        assert_eq!(
            policy,
            ThresholdPolicy::Adaptive { floor: 0.2, ratio: 0.1, noise_ratio: 4.0 }
        );
    }

    #[test]
    fn rejects_negative_parameters() {
        assert!(ThresholdPolicy::default().validate().is_ok());
        assert!(ThresholdPolicy::Fixed { cutoff: -1.0 }.validate().is_err());
        assert!(ThresholdPolicy::Adaptive { floor: 0.1, ratio: f64::NAN, noise_ratio: 4.0 }
            .validate()
            .is_err());
        assert!(ThresholdPolicy::Adaptive { floor: 0.1, ratio: 0.1, noise_ratio: -1.0 }
            .validate()
            .is_err());
    }

    #[test]
    fn candidates_are_centred_on_windows() {
        let mut values = vec![0.0; 100];
        values[20..40].fill(1.0);
        let series = PresenceSeries {
            frequency: 1.0,
            period: 6,
            window_width: 6,
            stride: 1,
            signal_len: 105,
            values,
            noise_floor: 0.0,
        };
        let waves = candidate_waves(&series, &ThresholdPolicy::Fixed { cutoff: 0.5 });
        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].start_idx(), 23);
        assert_eq!(waves[0].end_idx(), 43);
        assert_eq!(waves[0].confidence(), 1.0);
    }

    #[test]
    fn runs_are_trimmed_to_half_peak() {
        let values = [0.2, 0.4, 1.0, 1.0, 0.6, 0.3, 0.2];
        assert_eq!(trim_to_half_peak(&values, Window::new(0, 7)), Window::new(2, 5));
        assert_eq!(trim_to_half_peak(&values, Window::new(5, 7)), Window::new(5, 7));

        let mut ramp = vec![0.0; 60];
        for (i, value) in ramp.iter_mut().enumerate().take(50).skip(10) {
            *value = (i as f64 - 10.0).min(10.0) / 10.0;
        }
        let series = PresenceSeries {
            frequency: 1.0,
            period: 6,
            window_width: 6,
            stride: 1,
            signal_len: 65,
            values: ramp,
            noise_floor: 0.0,
        };
        let waves = candidate_waves(&series, &ThresholdPolicy::Fixed { cutoff: 0.15 });
        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].start_idx(), 18);
        assert_eq!(waves[0].end_idx(), 53);
    }

    proptest! {
        #[test]
        fn raising_the_cutoff_only_shrinks(
            values in prop::collection::vec(0.0f64..2.0, 0..120),
            low in 0.0f64..2.0,
            delta in 0.0f64..1.0,
        ) {
            let loose = segment(&values, low);
            let strict = segment(&values, low + delta);
            for s in &strict {
                prop_assert!(
                    loose.iter().any(|l| l.lower <= s.lower && s.upper <= l.upper),
                    "{:?} not inside {:?}", s, loose
                );
            }
            let covered = |runs: &[Window]| runs.iter().map(Window::len).sum::<usize>();
            prop_assert!(covered(&strict) <= covered(&loose));
        }
    }
}
