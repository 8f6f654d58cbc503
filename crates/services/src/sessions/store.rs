use std::fmt;
use std::sync::Arc;

use drill_core::model::{ProgressLog, QuestionId, Verdict};
use storage::repository::ProgressRepository;
use tracing::{debug, warn};

use crate::Clock;
use crate::error::ProgressError;

/// Owns the progress log for one run and writes it through a repository.
///
/// The log is loaded once, mutated in memory, and rewritten in full after
/// every recorded verdict.
pub struct ProgressStore {
    log: ProgressLog,
    repo: Arc<dyn ProgressRepository>,
    clock: Clock,
}

impl ProgressStore {
    /// Load the persisted log (or start empty) and open a new session entry.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Corrupt` if persisted data exists but cannot be
    /// read back, or `ProgressError::Storage` for other storage failures.
    pub async fn load_or_create(
        repo: Arc<dyn ProgressRepository>,
        clock: Clock,
    ) -> Result<Self, ProgressError> {
        let log = Self::peek(repo.as_ref()).await?;
        debug!(previous_entries = log.len(), "progress log loaded");
        Ok(Self::open(log, repo, clock))
    }

    /// Read the persisted log without opening a session entry.
    ///
    /// # Errors
    ///
    /// Same classification as `load_or_create`.
    pub async fn peek(repo: &dyn ProgressRepository) -> Result<ProgressLog, ProgressError> {
        let log = repo
            .load_log()
            .await
            .map_err(ProgressError::from_load)?
            .unwrap_or_default();
        Ok(log)
    }

    /// Start from an empty log, ignoring whatever is persisted.
    ///
    /// The next `persist` overwrites the stored log.
    #[must_use]
    pub fn fresh(repo: Arc<dyn ProgressRepository>, clock: Clock) -> Self {
        warn!("starting from an empty progress log");
        Self::open(ProgressLog::new(), repo, clock)
    }

    fn open(mut log: ProgressLog, repo: Arc<dyn ProgressRepository>, clock: Clock) -> Self {
        log.begin_entry(clock.now());
        Self { log, repo, clock }
    }

    #[must_use]
    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn record_known(&mut self, id: QuestionId) {
        self.log.record(id, Verdict::Known, self.clock.now());
    }

    pub fn record_unknown(&mut self, id: QuestionId) {
        self.log.record(id, Verdict::Unknown, self.clock.now());
    }

    /// Record a verdict and persist it.
    ///
    /// If the write fails the verdict is taken back out of the log, so a
    /// verdict is only kept once it is durable.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the log cannot be written.
    pub async fn record_verdict(
        &mut self,
        id: QuestionId,
        verdict: Verdict,
    ) -> Result<(), ProgressError> {
        match verdict {
            Verdict::Known => self.record_known(id),
            Verdict::Unknown => self.record_unknown(id),
        }
        if let Err(err) = self.persist().await {
            self.log.retract(id, verdict);
            return Err(err);
        }
        Ok(())
    }

    /// Open a new entry for a retry pass, extending all three sequences.
    pub fn begin_retry_pass(&mut self) {
        self.log.begin_entry(self.clock.now());
    }

    /// Write the full log to storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the repository rejects the write.
    pub async fn persist(&self) -> Result<(), ProgressError> {
        self.repo.save_log(&self.log).await?;
        Ok(())
    }

    #[must_use]
    pub fn current_known_count(&self) -> usize {
        self.log.current_known().len()
    }

    #[must_use]
    pub fn current_unknown_ids(&self) -> &[QuestionId] {
        self.log.current_unknown()
    }
}

impl fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressStore")
            .field("entries", &self.log.len())
            .field("current_known", &self.log.current_known().len())
            .field("current_unknown", &self.log.current_unknown().len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
