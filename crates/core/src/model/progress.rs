use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressLogError {
    #[error("progress sequences differ in length (time={time}, known={known}, unknown={unknown})")]
    LengthMismatch {
        time: usize,
        known: usize,
        unknown: usize,
    },
}

/// Self-reported outcome for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Known,
    Unknown,
}

impl Verdict {
    #[must_use]
    pub fn from_correct(is_correct: bool) -> Self {
        if is_correct { Self::Known } else { Self::Unknown }
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        matches!(self, Self::Known)
    }
}

/// Cumulative attempt history across runs.
///
/// Three parallel sequences with one entry per session (or retry pass). The
/// last entry is the live one; verdicts are only ever appended to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressLog {
    time: Vec<DateTime<Utc>>,
    known: Vec<Vec<QuestionId>>,
    unknown: Vec<Vec<QuestionId>>,
}

/// Borrowed view of a single log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEntry<'a> {
    pub started_at: DateTime<Utc>,
    pub known: &'a [QuestionId],
    pub unknown: &'a [QuestionId],
}

impl ProgressEntry<'_> {
    #[must_use]
    pub fn answered(&self) -> usize {
        self.known.len() + self.unknown.len()
    }
}

/// Known/unknown totals across every entry of a log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeTotals {
    pub entries: usize,
    pub known: usize,
    pub unknown: usize,
}

impl ProgressLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a log from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressLogError::LengthMismatch` if the sequences are not parallel.
    pub fn from_persisted(
        time: Vec<DateTime<Utc>>,
        known: Vec<Vec<QuestionId>>,
        unknown: Vec<Vec<QuestionId>>,
    ) -> Result<Self, ProgressLogError> {
        if time.len() != known.len() || time.len() != unknown.len() {
            return Err(ProgressLogError::LengthMismatch {
                time: time.len(),
                known: known.len(),
                unknown: unknown.len(),
            });
        }
        Ok(Self {
            time,
            known,
            unknown,
        })
    }

    /// Append a new empty entry to all three sequences.
    ///
    /// Used both when a run starts and when a retry pass begins.
    pub fn begin_entry(&mut self, started_at: DateTime<Utc>) {
        self.time.push(started_at);
        self.known.push(Vec::new());
        self.unknown.push(Vec::new());
    }

    /// Append `id` to the live entry. Opens an entry first if the log is empty.
    pub fn record(&mut self, id: QuestionId, verdict: Verdict, now: DateTime<Utc>) {
        if self.time.is_empty() {
            self.begin_entry(now);
        }
        let target = match verdict {
            Verdict::Known => self.known.last_mut(),
            Verdict::Unknown => self.unknown.last_mut(),
        };
        if let Some(ids) = target {
            ids.push(id);
        }
    }

    /// Remove the most recent `id` recorded under `verdict` in the live entry.
    ///
    /// Returns false if the live entry does not end with `id`.
    pub fn retract(&mut self, id: QuestionId, verdict: Verdict) -> bool {
        let target = match verdict {
            Verdict::Known => self.known.last_mut(),
            Verdict::Unknown => self.unknown.last_mut(),
        };
        match target {
            Some(ids) if ids.last() == Some(&id) => {
                ids.pop();
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    #[must_use]
    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    #[must_use]
    pub fn known(&self) -> &[Vec<QuestionId>] {
        &self.known
    }

    #[must_use]
    pub fn unknown(&self) -> &[Vec<QuestionId>] {
        &self.unknown
    }

    #[must_use]
    pub fn current_known(&self) -> &[QuestionId] {
        self.known.last().map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn current_unknown(&self) -> &[QuestionId] {
        self.unknown.last().map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn current_entry(&self) -> Option<ProgressEntry<'_>> {
        self.entry(self.len().checked_sub(1)?)
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<ProgressEntry<'_>> {
        Some(ProgressEntry {
            started_at: *self.time.get(index)?,
            known: self.known.get(index)?,
            unknown: self.unknown.get(index)?,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = ProgressEntry<'_>> {
        (0..self.len()).filter_map(|idx| self.entry(idx))
    }

    #[must_use]
    pub fn lifetime_totals(&self) -> LifetimeTotals {
        LifetimeTotals {
            entries: self.len(),
            known: self.known.iter().map(Vec::len).sum(),
            unknown: self.unknown.iter().map(Vec::len).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn ids(raw: &[u64]) -> Vec<QuestionId> {
        raw.iter().copied().map(QuestionId::new).collect()
    }

    #[test]
    fn begin_entry_keeps_sequences_parallel() {
        let mut log = ProgressLog::new();
        log.begin_entry(fixed_now());
        log.begin_entry(fixed_now());

        assert_eq!(log.time().len(), 2);
        assert_eq!(log.known().len(), 2);
        assert_eq!(log.unknown().len(), 2);
    }

    #[test]
    fn record_appends_to_live_entry_only() {
        let mut log = ProgressLog::new();
        log.begin_entry(fixed_now());
        log.record(QuestionId::new(1), Verdict::Known, fixed_now());
        log.begin_entry(fixed_now());
        log.record(QuestionId::new(2), Verdict::Unknown, fixed_now());
        log.record(QuestionId::new(3), Verdict::Known, fixed_now());

        assert_eq!(log.known()[0], ids(&[1]));
        assert!(log.unknown()[0].is_empty());
        assert_eq!(log.current_known(), ids(&[3]).as_slice());
        assert_eq!(log.current_unknown(), ids(&[2]).as_slice());
    }

    #[test]
    fn record_on_empty_log_opens_an_entry() {
        let mut log = ProgressLog::new();
        log.record(QuestionId::new(5), Verdict::Unknown, fixed_now());

        assert_eq!(log.len(), 1);
        assert_eq!(log.current_unknown(), ids(&[5]).as_slice());
    }

    #[test]
    fn retract_only_removes_matching_tail() {
        let mut log = ProgressLog::new();
        log.begin_entry(fixed_now());
        log.record(QuestionId::new(1), Verdict::Known, fixed_now());

        assert!(!log.retract(QuestionId::new(2), Verdict::Known));
        assert!(!log.retract(QuestionId::new(1), Verdict::Unknown));
        assert!(log.retract(QuestionId::new(1), Verdict::Known));
        assert!(log.current_known().is_empty());
    }

    #[test]
    fn from_persisted_rejects_ragged_sequences() {
        let err = ProgressLog::from_persisted(vec![fixed_now()], vec![vec![]], vec![]).unwrap_err();
        assert_eq!(
            err,
            ProgressLogError::LengthMismatch {
                time: 1,
                known: 1,
                unknown: 0
            }
        );
    }

    #[test]
    fn entries_and_totals() {
        let log = ProgressLog::from_persisted(
            vec![fixed_now(), fixed_now()],
            vec![ids(&[0, 1]), ids(&[2])],
            vec![ids(&[2]), vec![]],
        )
        .unwrap();

        let answered: Vec<_> = log.entries().map(|e| e.answered()).collect();
        assert_eq!(answered, vec![3, 1]);
        assert_eq!(
            log.lifetime_totals(),
            LifetimeTotals {
                entries: 2,
                known: 3,
                unknown: 1
            }
        );
        assert_eq!(log.current_entry().unwrap().known, ids(&[2]).as_slice());
    }

    #[test]
    fn verdict_from_correct() {
        assert!(Verdict::from_correct(true).is_known());
        assert_eq!(Verdict::from_correct(false), Verdict::Unknown);
    }
}
