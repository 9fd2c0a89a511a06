//! Finds where each probed frequency is present in a composite signal.
//!
//! Per frequency the pipeline runs probe → segment → join → discard, and the
//! per-frequency results are concatenated in probe order.

pub mod join;
pub mod probe;
pub mod segment;
pub mod wave;
pub mod window;

use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::spectral::filter::{FrequencyFilter, ReferenceTones};
use crate::spectral::frequency_to_period;

pub use probe::PresenceSeries;
pub use segment::ThresholdPolicy;
pub use wave::{Wave, WaveDecomposition};

/// Intermediate and final results for one frequency.
#[derive(Debug, Clone)]
pub struct FrequencyAnalysis {
    pub frequency: f64,
    pub presence: PresenceSeries,
    pub waves: Vec<Wave>,
}

/// Full output of [`Decomposer::analyze`]: the decomposition plus the
/// presence series it was derived from, for frequencies that succeeded.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub decomposition: WaveDecomposition,
    pub frequencies: Vec<FrequencyAnalysis>,
}

/// Runs the decomposition pipeline with a shared reference-tone cache.
pub struct Decomposer {
    config: AnalysisConfig,
    tones: ReferenceTones,
}

impl Decomposer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            tones: ReferenceTones::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn tones(&self) -> &ReferenceTones {
        &self.tones
    }

    /// Probe, segment, join and filter the waves of a single frequency.
    pub fn analyze_frequency(
        &self,
        signal: &[f64],
        frequency: f64,
        filter: &mut FrequencyFilter<'_>,
    ) -> Result<FrequencyAnalysis> {
        let presence = probe::probe(signal, frequency, &self.config, filter)?;
        let candidates = segment::candidate_waves(&presence, &self.config.threshold);

        let period = frequency_to_period(frequency);
        let min_len = self.config.min_duration_periods.saturating_mul(period);
        let edge_min_len = self.config.edge_min_duration_periods.saturating_mul(period);
        let joined = join::join(candidates, min_len);
        let waves = join::discard_short(joined, signal.len(), min_len, edge_min_len);

        log::debug!(
            "Frequency {}: period {} samples, {} waves",
            frequency,
            period,
            waves.len()
        );
        Ok(FrequencyAnalysis {
            frequency,
            presence,
            waves,
        })
    }

    /// Analyzes every frequency, calling `tick` as each one finishes.
    ///
    /// A frequency that fails is logged and contributes no waves; the others
    /// are unaffected. Output order follows `frequencies`.
    pub fn analyze_with_progress<F>(&self, signal: &[f64], frequencies: &[f64], tick: F) -> Analysis
    where
        F: Fn() + Sync,
    {
        let run = |frequency: f64, filter: &mut FrequencyFilter<'_>| {
            let result = self.analyze_frequency(signal, frequency, filter);
            tick();
            match result {
                Ok(analysis) => Some(analysis),
                Err(err) => {
                    log::warn!("Skipping frequency {}: {}", frequency, err);
                    None
                }
            }
        };

        let results: Vec<Option<FrequencyAnalysis>> = if self.config.parallel {
            frequencies
                .par_iter()
                .map_init(|| FrequencyFilter::new(&self.tones), |filter, &f| run(f, filter))
                .collect()
        } else {
            let mut filter = FrequencyFilter::new(&self.tones);
            frequencies.iter().map(|&f| run(f, &mut filter)).collect()
        };

        let mut analysis = Analysis::default();
        for result in results.into_iter().flatten() {
            analysis.decomposition.push_frequency(result.waves.clone());
            analysis.frequencies.push(result);
        }
        analysis
    }

    pub fn analyze(&self, signal: &[f64], frequencies: &[f64]) -> Analysis {
        self.analyze_with_progress(signal, frequencies, || {})
    }

    pub fn decompose(&self, signal: &[f64], frequencies: &[f64]) -> WaveDecomposition {
        let analysis = self.analyze(signal, frequencies);
        log::debug!(
            "Decomposed {} samples over {} frequencies into {} waves ({} cached tones)",
            signal.len(),
            frequencies.len(),
            analysis.decomposition.len(),
            self.tones.len()
        );
        analysis.decomposition
    }
}

impl Default for Decomposer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// Decomposes `signal` over `frequencies` with the default configuration.
pub fn decompose(signal: &[f64], frequencies: &[f64]) -> WaveDecomposition {
    Decomposer::default().decompose(signal, frequencies)
}
