use std::path::Path;

use drill_core::model::QuestionBank;
use tracing::{debug, info};

use crate::error::BankError;

/// Read and parse the question bank at `path`.
///
/// # Errors
///
/// Returns `BankError::Unreadable` if the file cannot be read as UTF-8 text,
/// or `BankError::Format` if it holds no valid records.
pub fn load_bank(path: &Path) -> Result<QuestionBank, BankError> {
    let source = std::fs::read_to_string(path).map_err(|source| BankError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let bank = QuestionBank::parse(&source).map_err(|source| BankError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    let skipped = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
        .saturating_sub(bank.len());
    if skipped > 0 {
        debug!(skipped, "ignored malformed question lines");
    }
    info!(
        path = %path.display(),
        questions = bank.len(),
        categories = bank.all_categories().len(),
        "question bank loaded"
    );
    Ok(bank)
}
