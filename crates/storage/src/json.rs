//! Progress log persisted as a single JSON document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use drill_core::model::ProgressLog;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::repository::{ProgressLogRecord, ProgressRepository, StorageError};

/// Stores the whole log in one file, rewritten on every save.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers only ever observe a complete document.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_else(|| "progress.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ProgressRepository for JsonFileRepository {
    async fn load_log(&self) -> Result<Option<ProgressLog>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no progress file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record: ProgressLogRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display())))?;
        record.into_log().map(Some)
    }

    async fn save_log(&self, log: &ProgressLog) -> Result<(), StorageError> {
        let record = ProgressLogRecord::from_log(log);
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let staging = self.staging_path();
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(&bytes).await?;
        // Data must be on disk before the rename makes it visible.
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), entries = log.len(), "progress saved");
        Ok(())
    }
}
