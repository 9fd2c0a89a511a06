//! Decomposes a sampled signal into time intervals where known base
//! frequencies are present.

pub mod config;
pub mod decompose;
pub mod diagnostics;
pub mod error;
pub mod signal;
pub mod spectral;

pub use config::{AnalysisConfig, Config, SignalConfig};
pub use decompose::{decompose, Decomposer, ThresholdPolicy, Wave, WaveDecomposition};
pub use error::{DecomposeError, Result};
