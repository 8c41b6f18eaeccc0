//! Domain types for the apnea detection pipeline.

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Classification outcome for a single epoch.
///
/// The integer and string forms are a wire contract shared with the
/// externally trained model and the HTTP front end; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpochLabel {
    /// No apnea activity.
    Normal,
    /// The epoch immediately preceding an apnea interval.
    #[serde(rename = "Pre-apnea Warning")]
    PreApneaWarning,
    /// Apnea in progress.
    Apnea,
}

impl EpochLabel {
    /// Integer class index used by the classifier (0, 1, 2).
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::PreApneaWarning => 1,
            Self::Apnea => 2,
        }
    }

    /// Label from a classifier class index.
    ///
    /// Returns `None` for indices outside the three-class set.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Normal),
            1 => Some(Self::PreApneaWarning),
            2 => Some(Self::Apnea),
            _ => None,
        }
    }

    /// Display string used in alert logs and HTTP responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::PreApneaWarning => "Pre-apnea Warning",
            Self::Apnea => "Apnea",
        }
    }

    /// Parse the display string form.
    #[must_use]
    pub fn from_str_label(s: &str) -> Option<Self> {
        match s {
            "Normal" => Some(Self::Normal),
            "Pre-apnea Warning" => Some(Self::PreApneaWarning),
            "Apnea" => Some(Self::Apnea),
            _ => None,
        }
    }

    /// Whether this label belongs to the alert set consumed by the
    /// consolidator (Pre-apnea Warning or Apnea).
    #[must_use]
    pub const fn is_alert(self) -> bool {
        matches!(self, Self::PreApneaWarning | Self::Apnea)
    }
}

/// One fixed-duration window of a continuous ECG signal, the atomic unit
/// of classification. Immutable once created by the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    /// 1-based index in signal order.
    pub index: u64,
    /// Samples for this window, `fs * duration_secs` of them.
    pub samples: Vec<f64>,
    /// Sampling rate in Hz.
    pub fs: f64,
    /// Window duration in seconds (15 for detection, 60 for the
    /// new-patient pipeline).
    pub duration_secs: u32,
}

impl Epoch {
    /// Create an epoch, validating that the sample count matches the
    /// declared geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidEpochLength`] when `samples.len()`
    /// differs from `fs * duration_secs`.
    pub fn new(
        index: u64,
        samples: Vec<f64>,
        fs: f64,
        duration_secs: u32,
    ) -> Result<Self, SignalError> {
        let expected = (fs * f64::from(duration_secs)) as usize;
        if samples.len() != expected {
            return Err(SignalError::InvalidEpochLength {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            index,
            samples,
            fs,
            duration_secs,
        })
    }

    /// Number of samples in the epoch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the epoch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Classifier output for one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class.
    pub label: EpochLabel,
    /// Maximum per-class probability emitted by the model, in [0, 1].
    pub confidence: f64,
}

/// One row of the append-only alert log: the persisted record of a
/// classified epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// 1-based epoch index.
    pub epoch: u64,
    /// Predicted label in display-string form.
    pub label: EpochLabel,
    /// Confidence probability in [0, 1].
    pub probability: f64,
}

impl AlertRecord {
    /// Whether this record belongs to the alert set.
    #[must_use]
    pub const fn is_alert(&self) -> bool {
        self.label.is_alert()
    }
}

/// A maximal run of alert epochs merged across gaps of at most
/// `max_gap` non-alert epochs. Derived, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApneaEvent {
    /// First alert epoch of the event (1-based).
    pub start_epoch: u64,
    /// Last alert epoch of the event (1-based, inclusive).
    pub end_epoch: u64,
    /// `end_epoch - start_epoch + 1`.
    pub duration_epochs: u64,
}

impl ApneaEvent {
    /// Build an event from its inclusive epoch range.
    #[must_use]
    pub const fn new(start_epoch: u64, end_epoch: u64) -> Self {
        Self {
            start_epoch,
            end_epoch,
            duration_epochs: end_epoch - start_epoch + 1,
        }
    }
}

/// Ground-truth apnea interval in seconds from the start of the
/// recording, as produced by the (external) annotation parser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApneaInterval {
    /// Interval start in seconds.
    pub start_sec: f64,
    /// Interval end in seconds (inclusive).
    pub end_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_index_round_trip() {
        for label in [
            EpochLabel::Normal,
            EpochLabel::PreApneaWarning,
            EpochLabel::Apnea,
        ] {
            assert_eq!(EpochLabel::from_index(label.as_index()), Some(label));
        }
        assert_eq!(EpochLabel::from_index(3), None);
    }

    #[test]
    fn label_strings_match_wire_contract() {
        assert_eq!(EpochLabel::Normal.as_str(), "Normal");
        assert_eq!(EpochLabel::PreApneaWarning.as_str(), "Pre-apnea Warning");
        assert_eq!(EpochLabel::Apnea.as_str(), "Apnea");
        assert_eq!(
            EpochLabel::from_str_label("Pre-apnea Warning"),
            Some(EpochLabel::PreApneaWarning)
        );
        assert_eq!(EpochLabel::from_str_label("pre-apnea"), None);
    }

    #[test]
    fn alert_set_excludes_normal() {
        assert!(!EpochLabel::Normal.is_alert());
        assert!(EpochLabel::PreApneaWarning.is_alert());
        assert!(EpochLabel::Apnea.is_alert());
    }

    #[test]
    fn epoch_new_validates_geometry() {
        let epoch = Epoch::new(1, vec![0.0; 1500], 100.0, 15).unwrap();
        assert_eq!(epoch.len(), 1500);

        let err = Epoch::new(1, vec![0.0; 1499], 100.0, 15).unwrap_err();
        assert!(matches!(
            err,
            SignalError::InvalidEpochLength {
                expected: 1500,
                actual: 1499,
            }
        ));
    }

    #[test]
    fn apnea_event_duration() {
        let ev = ApneaEvent::new(3, 4);
        assert_eq!(ev.duration_epochs, 2);
        let single = ApneaEvent::new(5, 5);
        assert_eq!(single.duration_epochs, 1);
    }

    #[test]
    fn alert_record_serde_uses_display_labels() {
        let record = AlertRecord {
            epoch: 7,
            label: EpochLabel::PreApneaWarning,
            probability: 0.83,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("Pre-apnea Warning"));
        let parsed: AlertRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
