//! Alert consolidation.
//!
//! Groups a time-ordered stream of alert epochs into maximal apnea
//! events. An open event extends while the next alert epoch satisfies
//! `epoch <= current_end + max_gap`; otherwise the event is emitted and
//! a new one opens. One state machine serves every input source (batch
//! results, model prediction logs); only the filtering in front of it
//! differs.
//!
//! The sorted-slice entry point assumes input already sorted by epoch
//! ascending — every call site sorts first, and
//! [`AlertConsolidator::consolidate_records`] does so internally.

use apnea_core::types::{AlertRecord, ApneaEvent};

/// Default gap tolerance in epochs.
pub const DEFAULT_MAX_GAP: u64 = 1;

/// Consolidation state: no open event, or an event being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Open { start: u64, end: u64 },
}

/// Gap-tolerant run-length grouper for alert epochs.
#[derive(Debug, Clone, Copy)]
pub struct AlertConsolidator {
    max_gap: u64,
}

impl Default for AlertConsolidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GAP)
    }
}

impl AlertConsolidator {
    /// Create a consolidator extending an open event while the next
    /// alert epoch is within `max_gap` of the current end.
    #[must_use]
    pub const fn new(max_gap: u64) -> Self {
        Self { max_gap }
    }

    /// Gap tolerance in epochs.
    #[must_use]
    pub const fn max_gap(&self) -> u64 {
        self.max_gap
    }

    /// Consolidate a sorted slice of alert epoch indices.
    ///
    /// Precondition: `alert_epochs` is sorted ascending (not re-checked
    /// at runtime beyond a debug assertion). Emitted events are
    /// non-overlapping, ordered by start epoch, and cover every input
    /// epoch exactly once.
    #[must_use]
    pub fn consolidate_sorted(&self, alert_epochs: &[u64]) -> Vec<ApneaEvent> {
        debug_assert!(
            alert_epochs.windows(2).all(|w| w[0] <= w[1]),
            "alert epochs must be sorted ascending"
        );

        let mut events = Vec::new();
        let mut state = State::Idle;

        for &epoch in alert_epochs {
            state = match state {
                State::Idle => State::Open {
                    start: epoch,
                    end: epoch,
                },
                State::Open { start, end } => {
                    if epoch <= end + self.max_gap {
                        State::Open { start, end: epoch }
                    } else {
                        events.push(ApneaEvent::new(start, end));
                        State::Open {
                            start: epoch,
                            end: epoch,
                        }
                    }
                }
            };
        }

        // Flush: a dangling open event is emitted, never dropped
        if let State::Open { start, end } = state {
            events.push(ApneaEvent::new(start, end));
        }

        events
    }

    /// Consolidate classification records: keep the alert set
    /// (Pre-apnea Warning, Apnea), sort by epoch, group.
    #[must_use]
    pub fn consolidate_records(&self, records: &[AlertRecord]) -> Vec<ApneaEvent> {
        let mut alert_epochs: Vec<u64> = records
            .iter()
            .filter(|r| r.is_alert())
            .map(|r| r.epoch)
            .collect();
        alert_epochs.sort_unstable();
        self.consolidate_sorted(&alert_epochs)
    }
}
