mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use cli::Cli;
use tonetrace::config::{self, Config};
use tonetrace::decompose::{Analysis, Decomposer, ThresholdPolicy};
use tonetrace::diagnostics;
use tonetrace::signal::{self, SineSignal};
use tonetrace::spectral::transform::forward_transform;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect tonetrace.toml / global config
    let config_path = cli
        .config
        .clone()
        .or_else(|| config::discover(&config::candidate_paths()));
    let mut cfg = match config_path {
        Some(ref path) => {
            let cfg = config::load_config(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.length == 1000 { cli.length = cfg.signal.length; }
            if cli.noise_level == 0.15 { cli.noise_level = cfg.signal.noise_level; }
            if cli.seed == 0 { cli.seed = cfg.signal.seed; }
            if cli.stride == 1 { cli.stride = cfg.analysis.stride; }
            if cli.window_periods == 4 { cli.window_periods = cfg.analysis.window_periods; }
            if !cli.no_noise { cli.no_noise = !cfg.signal.noise; }
            if !cli.no_smoothing { cli.no_smoothing = !cfg.analysis.smoothing; }
            if !cli.sequential { cli.sequential = !cfg.analysis.parallel; }
            cfg
        }
        None => Config::default(),
    };

    cfg.analysis.stride = cli.stride;
    cfg.analysis.window_periods = cli.window_periods;
    cfg.analysis.smoothing = !cli.no_smoothing;
    cfg.analysis.parallel = !cli.sequential;
    if let Some(cutoff) = cli.threshold {
        cfg.analysis.threshold = ThresholdPolicy::Fixed { cutoff };
    }
    cfg.signal.length = cli.length;
    cfg.signal.noise = !cli.no_noise;
    cfg.signal.noise_level = cli.noise_level;
    cfg.signal.seed = cli.seed;
    cfg.analysis.validate().context("Invalid analysis settings")?;

    log::info!("tonetrace - base frequency decomposition");

    // 1. Obtain the signal
    let (samples, base_signals) = match cli.input {
        Some(ref input) => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }
            log::info!("Input: {}", input.display());
            let text = std::fs::read_to_string(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let samples = signal::parse_samples(&text)
                .with_context(|| format!("Failed to parse samples in {}", input.display()))?;
            (samples, Vec::new())
        }
        None => {
            let base_signals = signal::demo_base_signals(cfg.signal.length);
            let samples = signal::generate(cfg.signal.length, &base_signals, cfg.signal.noise());
            (samples, base_signals)
        }
    };

    let frequencies: Vec<f64> = if cli.frequencies.is_empty() {
        if base_signals.is_empty() {
            anyhow::bail!("--frequencies is required with --input");
        }
        base_signals.iter().map(|s| s.sine.freq_factor).collect()
    } else {
        cli.frequencies.clone()
    };

    log::info!("Signal: {} samples", samples.len());
    log::info!("Frequencies: {:?}", frequencies);

    // 2. Decompose
    let decomposer = Decomposer::new(cfg.analysis.clone());
    let pb = ProgressBar::new(frequencies.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frequencies ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    let analysis = decomposer.analyze_with_progress(&samples, &frequencies, || pb.inc(1));
    pb.finish_with_message("Decomposition complete");

    // 3. Report
    log::info!("Signal decomposition:");
    for (i, wave) in analysis.decomposition.iter().enumerate() {
        log::info!("  Wave #{}: {}", i + 1, wave);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&analysis.decomposition)
            .context("Failed to serialize decomposition")?;
        println!("{json}");
    }

    if let Some(ref dir) = cli.dump_dir {
        dump(dir, &samples, &frequencies, &base_signals, &analysis)?;
    }

    log::info!("Done! {} waves", analysis.decomposition.len());
    Ok(())
}

fn dump(
    dir: &Path,
    samples: &[f64],
    frequencies: &[f64],
    base_signals: &[SineSignal],
    analysis: &Analysis,
) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let series: Vec<_> = analysis.frequencies.iter().map(|f| f.presence.clone()).collect();
    diagnostics::presence_table(&series).write_csv_file(&dir.join("base_probabilities.csv"))?;

    let spectrum = forward_transform(samples);
    diagnostics::harmonic_table(&spectrum, frequencies).write_csv_file(&dir.join("base_harmonics.csv"))?;

    for (i, base) in base_signals.iter().enumerate() {
        let path = dir.join(format!("base_signal_#{}.csv", i + 1));
        match diagnostics::base_signal_table(samples, base) {
            Ok(table) => table.write_csv_file(&path)?,
            Err(err) => log::warn!("Skipping {}: {}", path.display(), err),
        }
    }

    diagnostics::repaired_table(samples).write_csv_file(&dir.join("repaired-signal.csv"))?;
    log::info!("Diagnostics written to {}", dir.display());
    Ok(())
}
