//! Storage backends for epochs, alert logs, and event tables.
//!
//! Two [`EpochStore`] implementations: an in-memory map for tests and
//! service fixtures, and a directory store holding one raw
//! little-endian f64 file per epoch (`epoch_{n}.bin`) next to a small
//! JSON manifest recording the sampling geometry. Alert logs come as a
//! capacity-bounded in-memory ring and a CSV-backed append log.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use apnea_core::error::StorageError;
use apnea_core::traits::{AlertLog, EpochStore};
use apnea_core::types::{AlertRecord, ApneaEvent, ApneaInterval, Epoch};
use serde::{Deserialize, Serialize};

// ── In-memory epoch store ────────────────────────────────────────────────────

/// Epoch store backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryEpochStore {
    epochs: BTreeMap<u64, Epoch>,
}

impl MemoryEpochStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store built from segmented epochs.
    #[must_use]
    pub fn from_epochs(epochs: Vec<Epoch>) -> Self {
        let mut store = Self::new();
        for epoch in epochs {
            store.insert(epoch);
        }
        store
    }

    /// Insert one epoch, replacing any existing epoch with the same index.
    pub fn insert(&mut self, epoch: Epoch) {
        self.epochs.insert(epoch.index, epoch);
    }
}

impl EpochStore for MemoryEpochStore {
    fn get(&self, index: u64) -> Result<Epoch, StorageError> {
        self.epochs
            .get(&index)
            .cloned()
            .ok_or(StorageError::EpochNotFound { index })
    }

    fn indices(&self) -> Vec<u64> {
        self.epochs.keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.epochs.len()
    }
}

// ── Directory epoch store ────────────────────────────────────────────────────

/// Sampling geometry persisted next to the epoch files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoreManifest {
    fs: f64,
    epoch_secs: u32,
}

const MANIFEST_FILE: &str = "manifest.json";

/// Epoch store over a directory of `epoch_{n}.bin` files (raw
/// little-endian f64 samples).
#[derive(Debug, Clone)]
pub struct DirEpochStore {
    dir: PathBuf,
    fs: f64,
    epoch_secs: u32,
}

impl DirEpochStore {
    /// Create the directory (if needed) and write its manifest.
    ///
    /// # Errors
    ///
    /// I/O errors creating the directory or writing the manifest.
    pub fn create(dir: &Path, fs: f64, epoch_secs: u32) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir.display().to_string(), e))?;
        let manifest = StoreManifest { fs, epoch_secs };
        let manifest_path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            StorageError::Serialization {
                message: e.to_string(),
            }
        })?;
        std::fs::write(&manifest_path, json)
            .map_err(|e| StorageError::io(manifest_path.display().to_string(), e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            fs,
            epoch_secs,
        })
    }

    /// Open an existing store by reading its manifest.
    ///
    /// # Errors
    ///
    /// I/O errors reading the manifest, or a serialization error for a
    /// corrupt manifest.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let json = std::fs::read_to_string(&manifest_path)
            .map_err(|e| StorageError::io(manifest_path.display().to_string(), e))?;
        let manifest: StoreManifest =
            serde_json::from_str(&json).map_err(|e| StorageError::Serialization {
                message: format!("corrupt manifest: {e}"),
            })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            fs: manifest.fs,
            epoch_secs: manifest.epoch_secs,
        })
    }

    /// Deterministic file path for epoch `index`.
    #[must_use]
    pub fn epoch_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("epoch_{index}.bin"))
    }

    /// Persist one epoch.
    ///
    /// # Errors
    ///
    /// I/O errors writing the epoch file.
    pub fn put(&self, epoch: &Epoch) -> Result<(), StorageError> {
        let path = self.epoch_path(epoch.index);
        let mut file =
            File::create(&path).map_err(|e| StorageError::io(path.display().to_string(), e))?;
        let mut bytes = Vec::with_capacity(epoch.samples.len() * 8);
        for sample in &epoch.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        file.write_all(&bytes)
            .map_err(|e| StorageError::io(path.display().to_string(), e))
    }

    /// Sampling rate recorded in the manifest.
    #[must_use]
    pub fn fs(&self) -> f64 {
        self.fs
    }

    /// Epoch duration recorded in the manifest.
    #[must_use]
    pub fn epoch_secs(&self) -> u32 {
        self.epoch_secs
    }
}

impl EpochStore for DirEpochStore {
    fn get(&self, index: u64) -> Result<Epoch, StorageError> {
        let path = self.epoch_path(index);
        if !path.exists() {
            return Err(StorageError::EpochNotFound { index });
        }
        let samples = read_samples_f64le(&path)?;
        Ok(Epoch {
            index,
            samples,
            fs: self.fs,
            duration_secs: self.epoch_secs,
        })
    }

    fn indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter_map(|entry| parse_epoch_index(&entry.file_name().to_string_lossy()))
                .collect(),
            Err(_) => Vec::new(),
        };
        indices.sort_unstable();
        indices
    }

    fn len(&self) -> usize {
        self.indices().len()
    }
}

/// Parse `epoch_{n}.bin` into `n`.
fn parse_epoch_index(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("epoch_")?
        .strip_suffix(".bin")?
        .parse()
        .ok()
}

/// Read a raw little-endian f64 sample file.
///
/// # Errors
///
/// I/O errors, or a serialization error when the byte count is not a
/// multiple of eight.
pub fn read_samples_f64le(path: &Path) -> Result<Vec<f64>, StorageError> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| StorageError::io(path.display().to_string(), e))?;
    if bytes.len() % 8 != 0 {
        return Err(StorageError::Serialization {
            message: format!(
                "'{}' has {} bytes, not a whole number of f64 samples",
                path.display(),
                bytes.len()
            ),
        });
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("chunk of 8")))
        .collect())
}

/// Write samples as raw little-endian f64.
///
/// # Errors
///
/// I/O errors writing the file.
pub fn write_samples_f64le(path: &Path, samples: &[f64]) -> Result<(), StorageError> {
    let mut bytes = Vec::with_capacity(samples.len() * 8);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(path, bytes).map_err(|e| StorageError::io(path.display().to_string(), e))
}

// ── Alert logs ───────────────────────────────────────────────────────────────

/// Capacity-bounded in-memory alert log with ring-buffer semantics.
#[derive(Debug)]
pub struct MemoryAlertLog {
    records: Vec<AlertRecord>,
    max_records: usize,
}

impl MemoryAlertLog {
    /// Create a log retaining at most `max_records` records; the oldest
    /// are evicted when the capacity is exceeded.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::with_capacity(max_records.min(4096)),
            max_records: max_records.max(1),
        }
    }

    /// Default capacity (one night of 15 s epochs).
    #[must_use]
    pub fn default_capacity() -> Self {
        Self::new(2400)
    }

    /// All retained records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }
}

impl AlertLog for MemoryAlertLog {
    fn append(&mut self, record: AlertRecord) -> Result<(), StorageError> {
        if self.records.len() >= self.max_records {
            self.records.remove(0);
        }
        self.records.push(record);
        Ok(())
    }

    fn tail(&self, n: usize) -> Vec<AlertRecord> {
        let start = self.records.len().saturating_sub(n);
        self.records[start..].to_vec()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// CSV-backed append-only alert log (columns: epoch, label, probability).
#[derive(Debug)]
pub struct CsvAlertLog {
    path: PathBuf,
    records: Vec<AlertRecord>,
}

impl CsvAlertLog {
    /// Open (or create) the CSV log at `path`, loading existing rows.
    ///
    /// # Errors
    ///
    /// I/O or row-decoding errors for an existing file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let records = if path.exists() {
            read_alert_log_csv(path)?
        } else {
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertLog for CsvAlertLog {
    fn append(&mut self, record: AlertRecord) -> Result<(), StorageError> {
        let new_file = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(self.path.display().to_string(), e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer
            .serialize(&record)
            .and_then(|()| writer.flush().map_err(csv::Error::from))
            .map_err(|e| StorageError::Serialization {
                message: e.to_string(),
            })?;
        self.records.push(record);
        Ok(())
    }

    fn tail(&self, n: usize) -> Vec<AlertRecord> {
        let start = self.records.len().saturating_sub(n);
        self.records[start..].to_vec()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

// ── CSV row I/O ──────────────────────────────────────────────────────────────

/// Read an alert log CSV (columns: epoch, label, probability).
///
/// # Errors
///
/// I/O or row-decoding errors.
pub fn read_alert_log_csv(path: &Path) -> Result<Vec<AlertRecord>, StorageError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| StorageError::Serialization {
            message: format!("'{}': {e}", path.display()),
        })?;
    reader
        .deserialize()
        .collect::<Result<Vec<AlertRecord>, _>>()
        .map_err(|e| StorageError::Serialization {
            message: format!("'{}': {e}", path.display()),
        })
}

/// Write an alert log CSV.
///
/// # Errors
///
/// I/O or row-encoding errors.
pub fn write_alert_log_csv(path: &Path, records: &[AlertRecord]) -> Result<(), StorageError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| StorageError::Serialization {
        message: format!("'{}': {e}", path.display()),
    })?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| StorageError::Serialization {
                message: e.to_string(),
            })?;
    }
    writer.flush().map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}

/// Read ground-truth intervals (columns: start_sec, end_sec).
///
/// # Errors
///
/// I/O or row-decoding errors.
pub fn read_intervals_csv(path: &Path) -> Result<Vec<ApneaInterval>, StorageError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| StorageError::Serialization {
            message: format!("'{}': {e}", path.display()),
        })?;
    reader
        .deserialize()
        .collect::<Result<Vec<ApneaInterval>, _>>()
        .map_err(|e| StorageError::Serialization {
            message: format!("'{}': {e}", path.display()),
        })
}

/// Write consolidated events (columns: start_epoch, end_epoch,
/// duration_epochs).
///
/// # Errors
///
/// I/O or row-encoding errors.
pub fn write_events_csv(path: &Path, events: &[ApneaEvent]) -> Result<(), StorageError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| StorageError::Serialization {
        message: format!("'{}': {e}", path.display()),
    })?;
    for event in events {
        writer
            .serialize(event)
            .map_err(|e| StorageError::Serialization {
                message: e.to_string(),
            })?;
    }
    writer.flush().map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apnea_core::types::EpochLabel;

    fn epoch(index: u64, fill: f64) -> Epoch {
        Epoch {
            index,
            samples: vec![fill; 6],
            fs: 2.0,
            duration_secs: 3,
        }
    }

    fn record(epoch: u64, label: EpochLabel, probability: f64) -> AlertRecord {
        AlertRecord {
            epoch,
            label,
            probability,
        }
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryEpochStore::from_epochs(vec![epoch(2, 0.2), epoch(1, 0.1)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.indices(), vec![1, 2]);
        assert_eq!(store.get(1).unwrap().samples[0], 0.1);
        assert!(matches!(
            store.get(9),
            Err(StorageError::EpochNotFound { index: 9 })
        ));
    }

    #[test]
    fn dir_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirEpochStore::create(dir.path(), 2.0, 3).unwrap();
        store.put(&epoch(1, 0.5)).unwrap();
        store.put(&epoch(3, -1.5)).unwrap();

        let reopened = DirEpochStore::open(dir.path()).unwrap();
        assert_eq!(reopened.fs(), 2.0);
        assert_eq!(reopened.indices(), vec![1, 3]);
        let loaded = reopened.get(3).unwrap();
        assert_eq!(loaded.samples, vec![-1.5; 6]);
        assert_eq!(loaded.duration_secs, 3);
        assert!(matches!(
            reopened.get(2),
            Err(StorageError::EpochNotFound { index: 2 })
        ));
    }

    #[test]
    fn dir_store_keys_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirEpochStore::create(dir.path(), 2.0, 3).unwrap();
        assert!(store
            .epoch_path(17)
            .to_string_lossy()
            .ends_with("epoch_17.bin"));
    }

    #[test]
    fn raw_sample_file_rejects_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, [0_u8; 12]).unwrap();
        assert!(matches!(
            read_samples_f64le(&path),
            Err(StorageError::Serialization { .. })
        ));
    }

    #[test]
    fn memory_log_evicts_oldest_at_capacity() {
        let mut log = MemoryAlertLog::new(2);
        log.append(record(1, EpochLabel::Normal, 0.9)).unwrap();
        log.append(record(2, EpochLabel::Apnea, 0.8)).unwrap();
        log.append(record(3, EpochLabel::Apnea, 0.7)).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].epoch, 2);
    }

    #[test]
    fn memory_log_tail_returns_last_n() {
        let mut log = MemoryAlertLog::new(10);
        for i in 1..=5 {
            log.append(record(i, EpochLabel::Normal, 0.5)).unwrap();
        }
        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].epoch, 4);
        assert_eq!(tail[1].epoch, 5);
        assert_eq!(log.tail(100).len(), 5);
    }

    #[test]
    fn csv_log_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.csv");

        let mut log = CsvAlertLog::open(&path).unwrap();
        log.append(record(1, EpochLabel::Normal, 0.91)).unwrap();
        log.append(record(2, EpochLabel::PreApneaWarning, 0.72))
            .unwrap();
        drop(log);

        let reopened = CsvAlertLog::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        let tail = reopened.tail(1);
        assert_eq!(tail[0].label, EpochLabel::PreApneaWarning);
        assert!((tail[0].probability - 0.72).abs() < 1e-12);
    }

    #[test]
    fn alert_log_csv_uses_display_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        write_alert_log_csv(&path, &[record(4, EpochLabel::PreApneaWarning, 0.8)]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("epoch,label,probability"));
        assert!(contents.contains("Pre-apnea Warning"));

        let rows = read_alert_log_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].epoch, 4);
    }

    #[test]
    fn events_csv_round_trip_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        write_events_csv(
            &path,
            &[ApneaEvent::new(3, 4), ApneaEvent::new(10, 10)],
        )
        .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("start_epoch,end_epoch,duration_epochs"));
        assert!(contents.contains("3,4,2"));
        assert!(contents.contains("10,10,1"));
    }

    #[test]
    fn intervals_csv_reads_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intervals.csv");
        std::fs::write(&path, "start_sec,end_sec\n40.0,70.0\n90.5,120.0\n").unwrap();
        let intervals = read_intervals_csv(&path).unwrap();
        assert_eq!(intervals.len(), 2);
        assert!((intervals[1].start_sec - 90.5).abs() < 1e-12);
    }
}
