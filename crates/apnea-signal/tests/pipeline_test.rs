//! End-to-end validation of the segmentation → feature extraction path.

use apnea_signal::{EpochSegmenter, FeatureExtractor, NUM_FEATURES};
use std::f64::consts::PI;

/// A synthetic "recording": slow respiratory modulation over a cardiac
/// tone, plus a deterministic noise floor.
fn synthetic_recording(secs: usize, fs: f64) -> Vec<f64> {
    let n = (secs as f64 * fs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let cardiac = (2.0 * PI * 1.1 * t).sin();
            let respiratory = 0.4 * (2.0 * PI * 0.25 * t).sin();
            let noise = 0.05 * ((i as f64 * 2.71).sin() + (i as f64 * 1.37).cos());
            cardiac + respiratory + noise
        })
        .collect()
}

#[test]
fn full_recording_segments_and_extracts() {
    let fs = 100.0;
    let signal = synthetic_recording(95, fs); // 95 s → 6 full 15 s epochs

    let seg = EpochSegmenter::new(fs, 15);
    let epochs = seg.segment(&signal);
    assert_eq!(epochs.len(), 6);
    assert_eq!(seg.remainder(&signal).len(), 500);

    let extractor = FeatureExtractor::new(fs);
    for epoch in &epochs {
        let features = extractor.extract_epoch(epoch).unwrap();
        let array = features.to_array();
        assert_eq!(array.len(), NUM_FEATURES);
        assert!(array.iter().all(|v| v.is_finite()));
        // A live ECG-like epoch is never degenerate
        assert!(features.std > 0.0);
        assert!(features.sample_entropy > 0.0);
    }
}

#[test]
fn respiratory_tone_concentrates_in_hf_band() {
    // 0.25 Hz modulation sits inside HF [0.15, 0.4)
    let fs = 100.0;
    let n = 1500;
    let signal: Vec<f64> = (0..n)
        .map(|i| (2.0 * PI * 0.25 * i as f64 / fs).sin())
        .collect();

    let features = FeatureExtractor::new(fs).extract(&signal).unwrap();
    assert!(features.power_hf > features.power_vlf);
    assert!(features.power_hf > features.power_lf);
}

#[test]
fn matrix_export_matches_per_epoch_extraction() {
    let fs = 100.0;
    let signal = synthetic_recording(45, fs);
    let seg = EpochSegmenter::new(fs, 15);
    let epochs = seg.segment(&signal);

    let extractor = FeatureExtractor::new(fs);
    let (matrix, kept) = extractor.feature_matrix(&epochs);
    assert_eq!(kept, vec![1, 2, 3]);

    for (row, epoch) in epochs.iter().enumerate() {
        let expected = extractor.extract_epoch(epoch).unwrap().to_array();
        for (col, value) in expected.iter().enumerate() {
            assert!((matrix[[row, col]] - value).abs() < 1e-12);
        }
    }
}
