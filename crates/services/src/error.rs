//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use drill_core::model::{QuestionBankError, QuestionId};
use storage::repository::StorageError;

use crate::sessions::DrillState;

/// Errors emitted while loading the question bank.
///
/// Both variants are fatal at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("cannot read question bank {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank {} is unusable: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: QuestionBankError,
    },
}

/// Errors emitted by `ProgressStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    /// The persisted log exists but cannot be read back. Callers may start
    /// over from an empty log after surfacing this.
    #[error("progress log is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    /// Classify a failure that happened while loading the log.
    pub(crate) fn from_load(err: StorageError) -> Self {
        match err {
            StorageError::Corrupt(msg) | StorageError::Serialization(msg) => Self::Corrupt(msg),
            StorageError::Io(e) => Self::Corrupt(e.to_string()),
            other => Self::Storage(other),
        }
    }

    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

/// Errors emitted by the drill session and planner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("the selected categories contain no questions")]
    EmptySelection,
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: DrillState,
    },
    #[error("question {0} is not in the bank")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
