use std::f64::consts::PI;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::transform::{Spectrum, Transformer};
use super::{frequency_to_index, median, validate_frequency};
use crate::error::{DecomposeError, Result};

/// Unit-amplitude, zero-phase tone `sin(n / frequency)` of `length` samples.
pub fn reference_tone(frequency: f64, length: usize) -> Vec<f64> {
    (0..length).map(|n| (n as f64 / frequency).sin()).collect()
}

/// Sample weighting applied before a spectrum is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taper {
    Rectangular,
    Hann,
}

impl Taper {
    pub fn weights(&self, size: usize) -> Vec<f64> {
        match self {
            Taper::Hann if size > 1 => (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
                .collect(),
            _ => vec![1.0; size],
        }
    }
}

/// Layout of an analysis buffer: the leading `support` samples carry signal
/// weighted by `taper`, the rest is zero padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framing {
    pub support: usize,
    pub taper: Taper,
}

impl Framing {
    pub fn new(support: usize, taper: Taper) -> Self {
        Self { support, taper }
    }

    /// Unweighted, unpadded buffer of `length` samples.
    pub fn full(length: usize) -> Self {
        Self::new(length, Taper::Rectangular)
    }

    pub fn weights(&self) -> Vec<f64> {
        self.taper.weights(self.support)
    }
}

/// Reference tone of `length` samples passed through `framing`.
pub fn framed_reference_tone(frequency: f64, length: usize, framing: Framing) -> Vec<f64> {
    let mut tone = reference_tone(frequency, length);
    let support = framing.support.min(length);
    for (sample, weight) in tone.iter_mut().zip(framing.taper.weights(support)) {
        *sample *= weight;
    }
    tone[support..].fill(0.0);
    tone
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ToneKey {
    frequency_bits: u64,
    length: usize,
    framing: Framing,
}

impl ToneKey {
    fn new(frequency: f64, length: usize, framing: Framing) -> Self {
        Self {
            frequency_bits: frequency.to_bits(),
            length,
            framing,
        }
    }
}

/// Memoized reference-tone spectra keyed by `(frequency, length, framing)`.
///
/// Safe to share between workers. Entries are never evicted; the key space is
/// bounded by the distinct frequency/window layouts actually probed.
#[derive(Debug, Default)]
pub struct ReferenceTones {
    spectra: DashMap<ToneKey, Arc<Spectrum>>,
}

impl ReferenceTones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spectrum(
        &self,
        frequency: f64,
        length: usize,
        transformer: &mut Transformer,
    ) -> Result<Arc<Spectrum>> {
        self.framed_spectrum(frequency, length, Framing::full(length), transformer)
    }

    pub fn framed_spectrum(
        &self,
        frequency: f64,
        length: usize,
        framing: Framing,
        transformer: &mut Transformer,
    ) -> Result<Arc<Spectrum>> {
        let key = ToneKey::new(frequency, length, framing);
        if let Some(hit) = self.spectra.get(&key) {
            return checked(hit.value(), frequency, length);
        }

        let computed = Arc::new(transformer.forward(&framed_reference_tone(frequency, length, framing)));
        match self.spectra.entry(key) {
            // Another worker populated the key while we were computing.
            Entry::Occupied(existing) => checked(existing.get(), frequency, length),
            Entry::Vacant(slot) => Ok(Arc::clone(slot.insert(computed).value())),
        }
    }

    /// Pre-populates an entry ahead of a parallel fan-out.
    ///
    /// `spectrum` must be the reference-tone spectrum for `(frequency, length)`;
    /// a differing entry already under that key is reported as a conflict.
    pub fn insert(&self, frequency: f64, length: usize, spectrum: Spectrum) -> Result<()> {
        self.insert_framed(frequency, length, Framing::full(length), spectrum)
    }

    pub fn insert_framed(&self, frequency: f64, length: usize, framing: Framing, spectrum: Spectrum) -> Result<()> {
        match self.spectra.entry(ToneKey::new(frequency, length, framing)) {
            Entry::Occupied(existing) if existing.get().as_slice() != spectrum.as_slice() => {
                Err(DecomposeError::CacheConflict { frequency, length })
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(spectrum));
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }
}

fn checked(spectrum: &Arc<Spectrum>, frequency: f64, length: usize) -> Result<Arc<Spectrum>> {
    if spectrum.len() == length {
        Ok(Arc::clone(spectrum))
    } else {
        Err(DecomposeError::CacheConflict { frequency, length })
    }
}

/// Output of [`FrequencyFilter::filter`].
#[derive(Debug, Clone)]
pub struct FilteredSignal {
    /// Time-domain signal after convolution with the reference tone.
    pub samples: Vec<f64>,
    /// Product of the composite and reference-tone spectra.
    pub spectrum: Spectrum,
}

/// Presence reading of one analysis buffer, in volume units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Presence {
    /// Amplitude of the target frequency.
    pub amplitude: f64,
    /// What a single bin holding only broadband noise reads on the same scale:
    /// the median bin magnitude up to Nyquist.
    pub noise: f64,
}

/// Isolates the component near one frequency by multiplying the signal's
/// spectrum with that of a reference tone (circular convolution in time).
pub struct FrequencyFilter<'a> {
    tones: &'a ReferenceTones,
    transformer: Transformer,
}

impl<'a> FrequencyFilter<'a> {
    pub fn new(tones: &'a ReferenceTones) -> Self {
        Self {
            tones,
            transformer: Transformer::new(),
        }
    }

    pub fn convolution_spectrum(&mut self, samples: &[f64], frequency: f64) -> Result<Spectrum> {
        validate_frequency(frequency)?;
        let reference = self.tones.spectrum(frequency, samples.len(), &mut self.transformer)?;
        let composite = self.transformer.forward(samples);

        Ok(composite
            .iter()
            .zip(reference.iter())
            .map(|(&c, &r)| c * r)
            .collect())
    }

    pub fn filter(&mut self, samples: &[f64], frequency: f64) -> Result<FilteredSignal> {
        let spectrum = self.convolution_spectrum(samples, frequency)?;
        let samples = self.transformer.inverse(&spectrum);
        Ok(FilteredSignal { samples, spectrum })
    }

    /// Amplitude of `frequency` inside an unweighted buffer.
    pub fn presence_amplitude(&mut self, samples: &[f64], frequency: f64) -> Result<f64> {
        Ok(self.presence(samples, frequency, Framing::full(samples.len()))?.amplitude)
    }

    /// Reads the convolution spectrum at the frequency's bin.
    ///
    /// `samples` must already carry `framing`'s weights and padding. The
    /// reference tone goes through the same framing and the product is divided
    /// by its own gain `|R[k]|²`, so a tone of volume `v` covering the support
    /// reads `v` whatever the taper or padding. A bin of 0 means not even one
    /// cycle fits the buffer, which reads as absent.
    pub fn presence(&mut self, samples: &[f64], frequency: f64, framing: Framing) -> Result<Presence> {
        validate_frequency(frequency)?;
        if samples.is_empty() {
            return Ok(Presence::default());
        }

        let reference = self
            .tones
            .framed_spectrum(frequency, samples.len(), framing, &mut self.transformer)?;
        let bin = frequency_to_index(frequency, samples.len());
        if bin == 0 {
            return Ok(Presence::default());
        }
        let Some(&target) = reference.get(bin) else {
            return Ok(Presence::default());
        };
        let gain = target.norm_sqr();
        if gain <= 1e-12 {
            return Ok(Presence::default());
        }

        let composite = self.transformer.forward(samples);
        let amplitude = (composite[bin] * target).norm() / gain;
        let nyquist = samples.len() / 2;
        let mut magnitudes: Vec<f64> = composite[1..=nyquist.max(1).min(samples.len() - 1)]
            .iter()
            .map(|c| c.norm())
            .collect();
        let noise = median(&mut magnitudes) * target.norm() / gain;

        Ok(Presence { amplitude, noise })
    }
}

/// One-shot [`FrequencyFilter::filter`] with a private cache.
pub fn filter_by_frequency(samples: &[f64], frequency: f64) -> Result<FilteredSignal> {
    let tones = ReferenceTones::new();
    FrequencyFilter::new(&tones).filter(samples, frequency)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Low,
    High,
}

/// Keeps bins at or below the frequency's bin (and their mirrors).
pub fn low_pass(samples: &[f64], frequency: f64) -> Result<Vec<f64>> {
    brick_wall(samples, frequency, Band::Low)
}

/// Keeps bins from the frequency's bin up to its mirror.
pub fn high_pass(samples: &[f64], frequency: f64) -> Result<Vec<f64>> {
    brick_wall(samples, frequency, Band::High)
}

fn brick_wall(samples: &[f64], frequency: f64, band: Band) -> Result<Vec<f64>> {
    validate_frequency(frequency)?;

    let n = samples.len();
    let lower = frequency_to_index(frequency, n);
    let upper = n.saturating_sub(lower);

    let mut transformer = Transformer::new();
    let mut spectrum = transformer.forward(samples);
    for (i, bin) in spectrum.iter_mut().enumerate() {
        let keep = match band {
            Band::Low => i <= lower || upper <= i,
            Band::High => lower <= i && i <= upper,
        };
        if !keep {
            *bin = Complex64::new(0.0, 0.0);
        }
    }
    Ok(transformer.inverse(&spectrum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn tone(len: usize, frequency: f64, amplitude: f64) -> Vec<f64> {
        reference_tone(frequency, len).into_iter().map(|s| s * amplitude).collect()
    }

    fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
        a.iter().zip(b).map(|(x, y)| x + y).collect()
    }

    #[test]
    fn reference_spectra_are_memoized() {
        let tones = ReferenceTones::new();
        let mut transformer = Transformer::new();
        let first = tones.spectrum(5.0, 31, &mut transformer).unwrap();
        let second = tones.spectrum(5.0, 31, &mut transformer).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(tones.len(), 1);

        tones.spectrum(5.0, 62, &mut transformer).unwrap();
        tones.spectrum(2.0, 13, &mut transformer).unwrap();
        assert_eq!(tones.len(), 3);
    }

    #[test]
    fn presence_reads_tone_volume() {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        let unit = filter.presence_amplitude(&tone(31, 5.0, 1.0), 5.0).unwrap();
        assert_abs_diff_eq!(unit, 1.0, epsilon = 1e-9);

        let loud = filter.presence_amplitude(&tone(31, 5.0, 2.5), 5.0).unwrap();
        assert_abs_diff_eq!(loud, 2.5, epsilon = 1e-9);

        assert_eq!(filter.presence_amplitude(&[], 5.0).unwrap(), 0.0);
    }

    #[test]
    fn filter_keeps_target_bin() {
        let composite = add(&tone(1000, 5.0, 1.0), &tone(1000, 2.0, 1.0));
        let filtered = filter_by_frequency(&composite, 5.0).unwrap();
        assert_eq!(filtered.samples.len(), 1000);
        assert_eq!(filtered.spectrum.len(), 1000);

        let target = filtered.spectrum[frequency_to_index(5.0, 1000)].norm();
        let other = filtered.spectrum[frequency_to_index(2.0, 1000)].norm();
        assert!(target > 20.0 * other, "target {target}, other {other}");
    }

    #[test]
    fn filter_rejects_zero_frequency() {
        assert!(matches!(
            filter_by_frequency(&[1.0, 2.0], 0.0),
            Err(DecomposeError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn conflicting_entries_are_reported() {
        let tones = ReferenceTones::new();
        let good = Transformer::new().forward(&reference_tone(5.0, 31));
        tones.insert(5.0, 31, good.clone()).unwrap();
        tones.insert(5.0, 31, good).unwrap();
        assert!(matches!(
            tones.insert(5.0, 31, vec![Complex64::new(0.0, 0.0); 31]),
            Err(DecomposeError::CacheConflict { length: 31, .. })
        ));

        tones.insert(2.0, 13, vec![Complex64::new(0.0, 0.0); 7]).unwrap();
        let mut filter = FrequencyFilter::new(&tones);
        assert!(matches!(
            filter.presence_amplitude(&tone(13, 2.0, 1.0), 2.0),
            Err(DecomposeError::CacheConflict { .. })
        ));
    }

    #[test]
    fn framed_presence_reads_volume_at_any_padding() {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        for (taper, padding) in [(Taper::Rectangular, 4), (Taper::Hann, 1), (Taper::Hann, 4)] {
            let framing = Framing::new(52, taper);
            let weights = framing.weights();
            let mut buffer = vec![0.0; 52 * padding];
            for (i, slot) in buffer[..52].iter_mut().enumerate() {
                *slot = 0.8 * (i as f64 / 2.0 + 0.4).sin() * weights[i];
            }
            let presence = filter.presence(&buffer, 2.0, framing).unwrap();
            assert!((presence.amplitude - 0.8).abs() < 0.05, "{taper:?} x{padding}: {presence:?}");
            assert!(presence.noise < 0.05);
        }
    }

    #[test]
    fn hann_taper_suppresses_distant_tones() {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        let framing = Framing::new(124, Taper::Hann);
        let weights = framing.weights();
        let loud: Vec<f64> = tone(124, 2.0, 3.0).iter().zip(&weights).map(|(s, w)| s * w).collect();
        let leaked = filter.presence(&loud, 5.0, framing).unwrap().amplitude;
        assert!(leaked < 0.05, "leaked {leaked}");
    }

    #[test]
    fn noise_reading_tracks_broadband_level() {
        use crate::signal::white_noise;
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        let framing = Framing::new(124, Taper::Hann);
        let weights = framing.weights();
        let read = |amplitude: f64, filter: &mut FrequencyFilter<'_>| {
            let noisy: Vec<f64> = white_noise(124, amplitude, 9).iter().zip(&weights).map(|(s, w)| s * w).collect();
            filter.presence(&noisy, 5.0, framing).unwrap().noise
        };
        let quiet = read(0.1, &mut filter);
        let loud = read(1.0, &mut filter);
        assert!(quiet > 0.0);
        assert_abs_diff_eq!(loud / quiet, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn too_few_samples_for_one_cycle_read_absent() {
        let tones = ReferenceTones::new();
        let mut filter = FrequencyFilter::new(&tones);
        assert_eq!(filter.presence_amplitude(&[0.5; 100], 1e9).unwrap(), 0.0);
        assert_eq!(filter.presence_amplitude(&[0.5; 100], 1e18).unwrap(), 0.0);
    }

    #[test]
    fn framings_are_cached_separately() {
        let tones = ReferenceTones::new();
        let mut transformer = Transformer::new();
        let plain = tones.spectrum(5.0, 124, &mut transformer).unwrap();
        let hann = tones
            .framed_spectrum(5.0, 124, Framing::new(124, Taper::Hann), &mut transformer)
            .unwrap();
        assert_eq!(tones.len(), 2);
        assert_ne!(plain.as_slice(), hann.as_slice());
        assert_eq!(Taper::Hann.weights(1), vec![1.0]);
        assert_eq!(Taper::Hann.weights(3), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn brick_wall_filters_split_bands() {
        let n = 256;
        let slow = tone(n, n as f64 / (2.0 * PI * 4.0), 1.0);
        let fast = tone(n, n as f64 / (2.0 * PI * 40.0), 1.0);
        let mixed = add(&slow, &fast);
        let cutoff = n as f64 / (2.0 * PI * 12.0);

        let low = low_pass(&mixed, cutoff).unwrap();
        let high = high_pass(&mixed, cutoff).unwrap();
        for i in 0..n {
            assert_abs_diff_eq!(low[i], slow[i], epsilon = 1e-9);
            assert_abs_diff_eq!(high[i], fast[i], epsilon = 1e-9);
        }
    }
}
