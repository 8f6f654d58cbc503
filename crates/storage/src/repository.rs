use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drill_core::model::{ProgressLog, QuestionId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::json::JsonFileRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted data exists but cannot be turned back into a progress log.
    #[error("corrupt progress data: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persisted shape of the progress log.
///
/// Field names match the on-disk JSON object (`time`, `known`, `unknown`) so
/// the domain type stays free of serialization concerns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLogRecord {
    pub time: Vec<DateTime<Utc>>,
    pub known: Vec<Vec<QuestionId>>,
    pub unknown: Vec<Vec<QuestionId>>,
}

impl ProgressLogRecord {
    #[must_use]
    pub fn from_log(log: &ProgressLog) -> Self {
        Self {
            time: log.time().to_vec(),
            known: log.known().to_vec(),
            unknown: log.unknown().to_vec(),
        }
    }

    /// Convert the record back into a domain `ProgressLog`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if the sequences are not parallel.
    pub fn into_log(self) -> Result<ProgressLog, StorageError> {
        ProgressLog::from_persisted(self.time, self.known, self.unknown)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }
}

/// Repository contract for the progress log.
///
/// The log is read in full and rewritten in full; adapters never append.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the persisted log.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` for unreadable data, or other storage errors.
    async fn load_log(&self) -> Result<Option<ProgressLog>, StorageError>;

    /// Replace the persisted log with `log`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be written.
    async fn save_log(&self, log: &ProgressLog) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    record: Arc<Mutex<Option<ProgressLogRecord>>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with a raw record, bypassing validation.
    #[must_use]
    pub fn with_record(record: ProgressLogRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of successful `save_log` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.lock().map_or(0, |guard| *guard)
    }

    /// Snapshot of the stored record, if any.
    #[must_use]
    pub fn stored(&self) -> Option<ProgressLogRecord> {
        self.record.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_log(&self) -> Result<Option<ProgressLog>, StorageError> {
        let guard = self
            .record
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clone().map(ProgressLogRecord::into_log).transpose()
    }

    async fn save_log(&self, log: &ProgressLog) -> Result<(), StorageError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(ProgressLogRecord::from_log(log));
        let mut saves = self
            .saves
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *saves += 1;
        Ok(())
    }
}

/// Aggregates the progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }

    /// Build a `Storage` backed by a single JSON file.
    #[must_use]
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(JsonFileRepository::new(path));
        Self { progress }
    }
}
