//! Column-oriented CSV dumps of intermediate results.

use std::io::Write;
use std::path::Path;

use crate::decompose::PresenceSeries;
use crate::error::{DecomposeError, Result};
use crate::signal::{base_signal_values, SineSignal};
use crate::spectral::filter::filter_by_frequency;
use crate::spectral::frequency_to_index;
use crate::spectral::transform::{
    forward_transform, inverse_transform, inverse_transform_harmonic, magnitude_spectrum, Spectrum,
};

/// Named columns written as `rows` CSV lines. Cells past the end of a short
/// column are left empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTable {
    titles: Vec<String>,
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl ColumnTable {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn push(&mut self, title: impl Into<String>, values: Vec<f64>) {
        self.titles.push(title.into());
        self.columns.push(values);
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "{}", self.titles.join(", "))?;
        for row in 0..self.rows {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|column| column.get(row).map_or_else(String::new, |v| format!("{v:.6}")))
                .collect();
            writeln!(out, "{}", line.join(", "))?;
        }
        out.flush()
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let wrap = |source| DecomposeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(wrap)?;
        self.write_csv(std::io::BufWriter::new(file)).map_err(wrap)?;
        log::info!("Wrote {} rows to {}", self.rows, path.display());
        Ok(())
    }
}

/// One `probability #i` column per presence series.
pub fn presence_table(series: &[PresenceSeries]) -> ColumnTable {
    let rows = series.iter().map(PresenceSeries::len).max().unwrap_or(0);
    let mut table = ColumnTable::new(rows);
    for (i, s) in series.iter().enumerate() {
        table.push(format!("probability #{}", i + 1), s.values.clone());
    }
    table
}

/// One `harmonic #i` column per frequency: the time-domain harmonic at the
/// frequency's bin of `spectrum`.
pub fn harmonic_table(spectrum: &Spectrum, frequencies: &[f64]) -> ColumnTable {
    let mut table = ColumnTable::new(spectrum.len());
    for (i, &frequency) in frequencies.iter().enumerate() {
        let bin = frequency_to_index(frequency, spectrum.len());
        table.push(format!("harmonic #{}", i + 1), inverse_transform_harmonic(spectrum, bin));
    }
    table
}

/// A base signal next to its filtered reconstruction from the composite.
pub fn base_signal_table(signal: &[f64], base: &SineSignal) -> Result<ColumnTable> {
    let (values, mask) = base_signal_values(base);
    let filtered = filter_by_frequency(signal, base.sine.freq_factor)?;

    let mut table = ColumnTable::new(signal.len());
    table.push("on/off", mask);
    table.push("original", values);
    table.push("spectrum", magnitude_spectrum(&filtered.spectrum));
    table.push("repaired", filtered.samples);
    Ok(table)
}

/// The composite signal, its magnitude spectrum and its inverse transform.
pub fn repaired_table(signal: &[f64]) -> ColumnTable {
    let spectrum = forward_transform(signal);
    let mut table = ColumnTable::new(signal.len());
    table.push("original", signal.to_vec());
    table.push("spectrum", magnitude_spectrum(&spectrum));
    table.push("repaired", inverse_transform(&spectrum));
    table
}
