//! End-to-end flow: segment → store → batch classify → consolidate.

use apnea_core::traits::{AlertLog, EpochStore};
use apnea_core::types::{ApneaEvent, EpochLabel};
use apnea_detect::store::{DirEpochStore, MemoryAlertLog};
use apnea_detect::{
    run_batch, AlertConsolidator, BatchConfig, ClassifierService, DecisionTree, ForestModel,
    TreeNode,
};
use apnea_signal::features::FEATURE_NAMES;
use apnea_signal::EpochSegmenter;

/// Forest that flags low-variance epochs as Apnea — a stand-in for the
/// trained model, with the same artifact shape.
fn flatline_classifier() -> ClassifierService {
    let tree = DecisionTree {
        nodes: vec![
            TreeNode {
                feature: 1, // std
                threshold: 0.05,
                left: 1,
                right: 2,
                value: vec![],
            },
            TreeNode {
                feature: -1,
                threshold: 0.0,
                left: -1,
                right: -1,
                value: vec![0.0, 1.0, 9.0],
            },
            TreeNode {
                feature: -1,
                threshold: 0.0,
                left: -1,
                right: -1,
                value: vec![9.0, 0.5, 0.5],
            },
        ],
    };
    ClassifierService::new(ForestModel {
        name: "flatline".into(),
        version: "test".into(),
        feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
        trees: vec![tree],
    })
}

/// 8 epochs of 15 s at 20 Hz; epochs 3, 4, and 7 are near-flat.
fn synthetic_signal() -> Vec<f64> {
    let fs = 20.0;
    let epoch_len = 300;
    let mut signal = Vec::with_capacity(8 * epoch_len);
    for epoch in 1..=8_u64 {
        let quiet = matches!(epoch, 3 | 4 | 7);
        for i in 0..epoch_len {
            let t = i as f64 / fs;
            if quiet {
                signal.push(0.001 * (t * 0.5).sin());
            } else {
                signal.push((2.0 * std::f64::consts::PI * 1.1 * t).sin()
                    + 0.2 * ((i as f64) * 1.37).sin());
            }
        }
    }
    signal
}

#[test]
fn recording_to_consolidated_events() {
    let dir = tempfile::tempdir().unwrap();
    let fs = 20.0;

    // Segment and persist
    let segmenter = EpochSegmenter::new(fs, 15);
    let epochs = segmenter.segment(&synthetic_signal());
    assert_eq!(epochs.len(), 8);

    let store = DirEpochStore::create(dir.path(), fs, 15).unwrap();
    for epoch in &epochs {
        store.put(epoch).unwrap();
    }
    assert_eq!(store.len(), 8);

    // Batch classify
    let classifier = flatline_classifier();
    let mut log = MemoryAlertLog::new(100);
    let outcome = run_batch(&store, &classifier, &mut log, &BatchConfig::default()).unwrap();
    assert_eq!(outcome.classified, 8);
    assert_eq!(outcome.alarms, 3);

    let records = log.tail(100);
    let flagged: Vec<u64> = records
        .iter()
        .filter(|r| r.label == EpochLabel::Apnea)
        .map(|r| r.epoch)
        .collect();
    assert_eq!(flagged, vec![3, 4, 7]);

    // Consolidate: 3 and 4 merge, 7 stands alone
    let events = AlertConsolidator::default().consolidate_records(&records);
    assert_eq!(
        events,
        vec![ApneaEvent::new(3, 4), ApneaEvent::new(7, 7)]
    );
}
