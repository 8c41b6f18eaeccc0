//! Epoch segmentation.
//!
//! Splits a continuous signal into fixed-length, non-overlapping windows
//! taken from the start of the recording. The trailing remainder (fewer
//! than one full epoch of samples) is discarded, never padded. A signal
//! shorter than one epoch yields an empty result rather than an error so
//! batch callers can skip short records gracefully.

use apnea_core::types::Epoch;
use ndarray::Array2;

/// Sampling rate of the apnea-ecg recordings after resampling, in Hz.
pub const DEFAULT_FS: f64 = 100.0;

/// Epoch duration for the detection pipeline, in seconds.
pub const DETECTION_EPOCH_SECS: u32 = 15;

/// Epoch duration for the new-patient pipeline, in seconds.
pub const NEW_PATIENT_EPOCH_SECS: u32 = 60;

/// Fixed-window segmenter for a known sampling rate and epoch duration.
#[derive(Debug, Clone, Copy)]
pub struct EpochSegmenter {
    fs: f64,
    duration_secs: u32,
}

impl EpochSegmenter {
    /// Create a segmenter for the given sampling rate and epoch duration.
    #[must_use]
    pub fn new(fs: f64, duration_secs: u32) -> Self {
        Self { fs, duration_secs }
    }

    /// Detection defaults: 100 Hz, 15 s epochs.
    #[must_use]
    pub fn detection_default() -> Self {
        Self::new(DEFAULT_FS, DETECTION_EPOCH_SECS)
    }

    /// New-patient defaults: 100 Hz, 60 s epochs.
    #[must_use]
    pub fn new_patient_default() -> Self {
        Self::new(DEFAULT_FS, NEW_PATIENT_EPOCH_SECS)
    }

    /// Samples per epoch (`fs * duration`).
    #[must_use]
    pub fn epoch_len(&self) -> usize {
        (self.fs * f64::from(self.duration_secs)) as usize
    }

    /// Number of full epochs a signal of `signal_len` samples yields.
    #[must_use]
    pub fn num_epochs(&self, signal_len: usize) -> usize {
        signal_len / self.epoch_len()
    }

    /// Sampling rate in Hz.
    #[must_use]
    pub fn fs(&self) -> f64 {
        self.fs
    }

    /// Epoch duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Partition `signal` into non-overlapping epochs with 1-based
    /// indices assigned in signal order.
    ///
    /// Returns an empty vector when the signal is shorter than one epoch.
    #[must_use]
    pub fn segment(&self, signal: &[f64]) -> Vec<Epoch> {
        let epoch_len = self.epoch_len();
        let num_epochs = signal.len() / epoch_len;

        let mut epochs = Vec::with_capacity(num_epochs);
        for i in 0..num_epochs {
            let start = i * epoch_len;
            let samples = signal[start..start + epoch_len].to_vec();
            epochs.push(Epoch {
                index: i as u64 + 1,
                samples,
                fs: self.fs,
                duration_secs: self.duration_secs,
            });
        }
        epochs
    }

    /// Segment into a `(num_epochs, epoch_len)` matrix, the layout used
    /// when handing a whole recording to batch feature export.
    ///
    /// Returns a `(0, epoch_len)` matrix when the signal is too short.
    #[must_use]
    pub fn segment_matrix(&self, signal: &[f64]) -> Array2<f64> {
        let epoch_len = self.epoch_len();
        let num_epochs = signal.len() / epoch_len;
        let trimmed = &signal[..num_epochs * epoch_len];
        Array2::from_shape_vec((num_epochs, epoch_len), trimmed.to_vec())
            .expect("trimmed length is num_epochs * epoch_len")
    }

    /// The trailing samples that did not fill a complete epoch.
    #[must_use]
    pub fn remainder<'a>(&self, signal: &'a [f64]) -> &'a [f64] {
        let epoch_len = self.epoch_len();
        let num_epochs = signal.len() / epoch_len;
        &signal[num_epochs * epoch_len..]
    }
}
