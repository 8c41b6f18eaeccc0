//! Welch power spectral density and frequency-band powers.
//!
//! The band definitions follow the heart-rate-variability convention:
//! VLF [0.003, 0.04), LF [0.04, 0.15), HF [0.15, 0.4) Hz. Band intervals
//! are half-open — a bin that lands exactly on an upper boundary belongs
//! to the next band and is never double-counted.

use apnea_core::error::SignalError;
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Very-low-frequency band bounds in Hz, half-open `[low, high)`.
pub const VLF_BAND: (f64, f64) = (0.003, 0.04);

/// Low-frequency band bounds in Hz, half-open `[low, high)`.
pub const LF_BAND: (f64, f64) = (0.04, 0.15);

/// High-frequency band bounds in Hz, half-open `[low, high)`.
pub const HF_BAND: (f64, f64) = (0.15, 0.4);

/// Maximum Welch segment length; shorter epochs fall back to one
/// full-length segment.
pub const MAX_SEGMENT_LEN: usize = 256;

/// One-sided power spectral density estimate.
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    /// Frequency bins in Hz, ascending from DC to Nyquist.
    pub freqs: Vec<f64>,
    /// Density values, one per frequency bin.
    pub psd: Vec<f64>,
}

impl PowerSpectrum {
    /// Sum of PSD values whose bin satisfies `low <= f < high`.
    ///
    /// The half-open upper bound matters: energy exactly at `high`
    /// belongs to the next band.
    #[must_use]
    pub fn band_power(&self, low: f64, high: f64) -> f64 {
        self.freqs
            .iter()
            .zip(self.psd.iter())
            .filter(|(&f, _)| f >= low && f < high)
            .map(|(_, &p)| p)
            .sum()
    }

    /// The three HRV band powers `(vlf, lf, hf)`.
    #[must_use]
    pub fn hrv_band_powers(&self) -> (f64, f64, f64) {
        (
            self.band_power(VLF_BAND.0, VLF_BAND.1),
            self.band_power(LF_BAND.0, LF_BAND.1),
            self.band_power(HF_BAND.0, HF_BAND.1),
        )
    }
}

/// Welch PSD estimate of `signal` at sampling rate `fs`.
///
/// Segment length is `min(256, signal.len())` with a Hann window, 50 %
/// overlap, per-segment constant detrend, and density scaling, matching
/// the estimator the models were trained against.
///
/// # Errors
///
/// Returns [`SignalError::InsufficientSamples`] for signals shorter than
/// two samples, which cannot be windowed.
pub fn welch_psd(signal: &[f64], fs: f64) -> Result<PowerSpectrum, SignalError> {
    let n = signal.len();
    if n < 2 {
        return Err(SignalError::InsufficientSamples {
            required: 2,
            available: n,
        });
    }

    let nperseg = n.min(MAX_SEGMENT_LEN);
    let step = (nperseg / 2).max(1);
    let n_segments = (n - nperseg) / step + 1;
    let n_freq = nperseg / 2 + 1;

    let window = hann_window(nperseg);
    let win_sumsq: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (fs * win_sumsq);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let mut psd = vec![0.0; n_freq];
    for seg in 0..n_segments {
        let start = seg * step;
        let chunk = &signal[start..start + nperseg];
        let seg_mean = chunk.iter().sum::<f64>() / nperseg as f64;

        let mut buffer: Vec<Complex64> = chunk
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex64::new((s - seg_mean) * w, 0.0))
            .collect();
        fft.process(&mut buffer);

        for (bin, value) in buffer.iter().take(n_freq).enumerate() {
            let mut power = value.norm_sqr() * scale;
            // One-sided spectrum: interior bins carry both halves
            if bin != 0 && !(nperseg % 2 == 0 && bin == n_freq - 1) {
                power *= 2.0;
            }
            psd[bin] += power;
        }
    }

    let inv_segments = 1.0 / n_segments as f64;
    for p in &mut psd {
        *p *= inv_segments;
    }

    let df = fs / nperseg as f64;
    let freqs = (0..n_freq).map(|k| k as f64 * df).collect();

    Ok(PowerSpectrum { freqs, psd })
}

/// Hann window of `size` samples.
fn hann_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}
