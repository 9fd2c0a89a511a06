use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::decompose::segment::ThresholdPolicy;
use crate::error::{DecomposeError, Result};
use crate::signal::Noise;
use crate::spectral::filter::Taper;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// Parameters of the decomposition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Samples between consecutive probe windows.
    #[serde(default = "default_stride")]
    pub stride: usize,
    /// Probe window length in periods of the probed frequency. Longer windows
    /// separate neighbouring frequencies better.
    #[serde(default = "default_window_periods")]
    pub window_periods: usize,
    #[serde(default = "default_taper")]
    pub taper: Taper,
    /// Each window is zero-padded to this multiple of its length.
    #[serde(default = "default_padding_periods")]
    pub padding_periods: usize,
    /// Moving average over one period of the presence series.
    #[serde(default = "default_smoothing")]
    pub smoothing: bool,
    #[serde(default)]
    pub threshold: ThresholdPolicy,
    /// Shortest wave kept and shortest gap left unmerged, in periods.
    #[serde(default = "default_min_duration_periods")]
    pub min_duration_periods: usize,
    /// Shortest wave kept when it runs into either end of the signal.
    #[serde(default = "default_edge_min_duration_periods")]
    pub edge_min_duration_periods: usize,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

/// Synthetic signal used when no input file is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default = "default_noise")]
    pub noise: bool,
    #[serde(default = "default_noise_level")]
    pub noise_level: f64,
    #[serde(default)]
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            window_periods: default_window_periods(),
            taper: default_taper(),
            padding_periods: default_padding_periods(),
            smoothing: default_smoothing(),
            threshold: ThresholdPolicy::default(),
            min_duration_periods: default_min_duration_periods(),
            edge_min_duration_periods: default_edge_min_duration_periods(),
            parallel: default_parallel(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            length: default_length(),
            noise: default_noise(),
            noise_level: default_noise_level(),
            seed: 0,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(DecomposeError::InvalidConfig("stride must be at least 1".into()));
        }
        if self.window_periods == 0 {
            return Err(DecomposeError::InvalidConfig("window_periods must be at least 1".into()));
        }
        if self.padding_periods == 0 {
            return Err(DecomposeError::InvalidConfig("padding_periods must be at least 1".into()));
        }
        if self.min_duration_periods == 0 {
            return Err(DecomposeError::InvalidConfig("min_duration_periods must be at least 1".into()));
        }
        if self.edge_min_duration_periods > self.min_duration_periods {
            return Err(DecomposeError::InvalidConfig(format!(
                "edge_min_duration_periods ({}) exceeds min_duration_periods ({})",
                self.edge_min_duration_periods, self.min_duration_periods
            )));
        }
        self.threshold.validate()
    }
}

impl SignalConfig {
    pub fn noise(&self) -> Option<Noise> {
        self.noise.then(|| Noise::new(self.noise_level, self.seed))
    }
}

fn default_stride() -> usize { 1 }
fn default_window_periods() -> usize { 4 }
fn default_taper() -> Taper { Taper::Hann }
fn default_padding_periods() -> usize { 1 }
fn default_smoothing() -> bool { true }
fn default_min_duration_periods() -> usize { 5 }
fn default_edge_min_duration_periods() -> usize { 2 }
fn default_parallel() -> bool { true }
fn default_length() -> usize { 1000 }
fn default_noise() -> bool { true }
fn default_noise_level() -> f64 { Noise::DEFAULT_LEVEL }

/// Config files looked up when none is given: `./tonetrace.toml`, then
/// `~/.config/tonetrace/config.toml`, then the platform config dir.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("tonetrace.toml")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join("tonetrace").join("config.toml"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("tonetrace").join("config.toml"));
    }
    paths
}

/// First of `candidates` that exists.
pub fn discover(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.exists()).cloned()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| DecomposeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&content)?;
    config.analysis.validate()?;
    Ok(config)
}
