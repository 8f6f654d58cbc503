use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::QuestionRecord;

/// Field separator in the question source.
pub const FIELD_DELIMITER: char = ';';

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("question source contains no valid `category;question;answer` lines")]
    NoRecords,
}

//
// ─── PARSING ───────────────────────────────────────────────────────────────────
//

/// Returns true for printable ASCII and the printable Latin-1 supplement.
fn is_printable(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}')
}

/// Removes every character outside the printable ASCII / Latin-1 ranges.
#[must_use]
pub fn strip_non_printable(line: &str) -> String {
    line.chars().filter(|c| is_printable(*c)).collect()
}

/// Splits a cleaned line into `(category, question, answer)`.
///
/// At most three parts are produced, so a delimiter inside the answer is kept.
fn split_fields(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, FIELD_DELIMITER);
    let category = parts.next()?;
    let question = parts.next()?;
    let answer = parts.next()?;
    Some((category, question, answer))
}

//
// ─── BANK ──────────────────────────────────────────────────────────────────────
//

/// Immutable table of questions, loaded once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    records: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Parse a bank from delimited text.
    ///
    /// Blank lines and lines that do not split into exactly three fields are
    /// skipped. Ids are assigned by position among the accepted lines.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::NoRecords` if no line was accepted.
    pub fn parse(source: &str) -> Result<Self, QuestionBankError> {
        let mut records = Vec::new();

        for raw in source.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let cleaned = strip_non_printable(trimmed);
            let Some((category, question, answer)) = split_fields(&cleaned) else {
                continue;
            };
            let id = QuestionId::new(records.len() as u64);
            records.push(QuestionRecord::new(id, category, question, answer));
        }

        Self::from_records(records)
    }

    /// Build a bank from already-constructed records.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::NoRecords` if `records` is empty.
    pub fn from_records(records: Vec<QuestionRecord>) -> Result<Self, QuestionBankError> {
        if records.is_empty() {
            return Err(QuestionBankError::NoRecords);
        }
        Ok(Self { records })
    }

    #[must_use]
    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&QuestionRecord> {
        // Ids are positional for parsed banks; fall back to a scan otherwise.
        usize::try_from(id.value())
            .ok()
            .and_then(|idx| self.records.get(idx))
            .filter(|record| record.id() == id)
            .or_else(|| self.records.iter().find(|record| record.id() == id))
    }

    /// Every distinct category, sorted.
    #[must_use]
    pub fn all_categories(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .map(|record| record.category().to_owned())
            .collect()
    }

    /// Number of questions per category, sorted by category name.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.category().to_owned()).or_insert(0) += 1;
        }
        counts
    }

    /// Records whose category is in `categories`, in bank order.
    #[must_use]
    pub fn records_in(&self, categories: &BTreeSet<String>) -> Vec<&QuestionRecord> {
        self.records
            .iter()
            .filter(|record| categories.contains(record.category()))
            .collect()
    }
}
