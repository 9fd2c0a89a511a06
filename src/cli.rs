use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tonetrace", about = "Locates base frequencies in time across a composite signal")]
pub struct Cli {
    /// Config file (default: tonetrace.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Samples to decompose, separated by whitespace, commas or semicolons.
    /// Without it a synthetic demo signal is generated.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Length of the generated signal in samples
    #[arg(long, default_value_t = 1000)]
    pub length: usize,

    /// Frequency factors to probe (comma-separated). Defaults to the demo base signals.
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    pub frequencies: Vec<f64>,

    /// Noise level of the generated signal, relative to its peak
    #[arg(long, default_value_t = 0.15)]
    pub noise_level: f64,

    /// Generate the signal without noise
    #[arg(long)]
    pub no_noise: bool,

    /// Noise seed
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Fixed presence cutoff, in volume units. Overrides the configured policy.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Samples between probe windows
    #[arg(long, default_value_t = 1)]
    pub stride: usize,

    /// Probe window length, in periods of each probed frequency
    #[arg(long, default_value_t = 4)]
    pub window_periods: usize,

    /// Disable the one-period moving average over presence values
    #[arg(long)]
    pub no_smoothing: bool,

    /// Probe frequencies one after another instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Directory for CSV dumps of presence series, harmonics and base signals
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,

    /// Print the decomposition as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
