use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use drill_core::model::{ProgressLog, QuestionBank, QuestionId, QuestionRecord, Verdict};
use tracing::{debug, info};

use super::plan::SessionPlanner;
use super::progress::{PassProgress, PassReport, QuestionPrompt};
use super::store::ProgressStore;
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where a drill session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillState {
    /// Showing `queue[index]`; no verdict controls are active.
    Presenting { index: usize },
    /// The correct answer for `queue[index]` is revealed; waiting for a verdict.
    AwaitingVerdict { index: usize },
    /// The pass is exhausted; a result and possibly a retry are on offer.
    Finished,
    /// The session is over. No further operations are valid.
    Terminated,
}

impl fmt::Display for DrillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presenting { index } => write!(f, "presenting question {index}"),
            Self::AwaitingVerdict { index } => {
                write!(f, "awaiting a verdict for question {index}")
            }
            Self::Finished => f.write_str("finished"),
            Self::Terminated => f.write_str("terminated"),
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one drill run: a first pass plus any retry passes.
///
/// Every transition is a named method; the front end renders the current
/// state and dispatches actions, nothing more.
pub struct DrillSession {
    bank: Arc<QuestionBank>,
    categories: BTreeSet<String>,
    store: ProgressStore,
    queue: Vec<QuestionId>,
    state: DrillState,
    pass: usize,
    report_shown: bool,
}

impl DrillSession {
    /// Plan the first pass and enter `Presenting(0)`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptySelection` if no question matches `categories`.
    pub fn start(
        bank: Arc<QuestionBank>,
        categories: BTreeSet<String>,
        store: ProgressStore,
        planner: &mut SessionPlanner,
    ) -> Result<Self, SessionError> {
        let queue = planner.build_queue(&bank, &categories)?;
        Self::from_queue(bank, categories, queue, store)
    }

    /// Enter `Presenting(0)` over an already planned queue.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptySelection` if `queue` is empty, or
    /// `SessionError::UnknownQuestion` if it names an id the bank lacks.
    pub fn from_queue(
        bank: Arc<QuestionBank>,
        categories: BTreeSet<String>,
        queue: Vec<QuestionId>,
        store: ProgressStore,
    ) -> Result<Self, SessionError> {
        if queue.is_empty() {
            return Err(SessionError::EmptySelection);
        }
        if let Some(missing) = queue.iter().find(|id| bank.get(**id).is_none()) {
            return Err(SessionError::UnknownQuestion(*missing));
        }
        info!(
            questions = queue.len(),
            categories = categories.len(),
            "drill session started"
        );
        Ok(Self {
            bank,
            categories,
            store,
            queue,
            state: DrillState::Presenting { index: 0 },
            pass: 1,
            report_shown: false,
        })
    }

    #[must_use]
    pub fn state(&self) -> DrillState {
        self.state
    }

    #[must_use]
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Ids of the current pass, in presentation order.
    #[must_use]
    pub fn queue(&self) -> &[QuestionId] {
        &self.queue
    }

    /// 1 for the first pass, incremented by every accepted retry.
    #[must_use]
    pub fn pass_number(&self) -> usize {
        self.pass
    }

    #[must_use]
    pub fn progress_log(&self) -> &ProgressLog {
        self.store.log()
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Hand the store back, e.g. to inspect the final log.
    #[must_use]
    pub fn into_store(self) -> ProgressStore {
        self.store
    }

    #[must_use]
    pub fn is_awaiting_verdict(&self) -> bool {
        matches!(self.state, DrillState::AwaitingVerdict { .. })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, DrillState::Finished)
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, DrillState::Terminated)
    }

    fn active_index(&self) -> Option<usize> {
        match self.state {
            DrillState::Presenting { index } | DrillState::AwaitingVerdict { index } => {
                Some(index)
            }
            DrillState::Finished | DrillState::Terminated => None,
        }
    }

    fn record_at(&self, index: usize) -> Result<&QuestionRecord, SessionError> {
        let id = self.queue[index];
        self.bank.get(id).ok_or(SessionError::UnknownQuestion(id))
    }

    /// The question to display while presenting or awaiting a verdict.
    #[must_use]
    pub fn current_question(&self) -> Option<QuestionPrompt<'_>> {
        let index = self.active_index()?;
        let record = self.record_at(index).ok()?;
        Some(QuestionPrompt {
            position: index + 1,
            total: self.queue.len(),
            category: record.category(),
            question: record.question(),
        })
    }

    /// The correct answer, only once it has been revealed.
    #[must_use]
    pub fn current_correct_answer(&self) -> Option<&str> {
        match self.state {
            DrillState::AwaitingVerdict { index } => {
                self.record_at(index).ok().map(QuestionRecord::answer)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> PassProgress {
        let answered = match self.state {
            DrillState::Presenting { index } | DrillState::AwaitingVerdict { index } => index,
            DrillState::Finished | DrillState::Terminated => self.queue.len(),
        };
        PassProgress {
            pass: self.pass,
            total: self.queue.len(),
            answered,
            remaining: self.queue.len().saturating_sub(answered),
            is_finished: !matches!(
                self.state,
                DrillState::Presenting { .. } | DrillState::AwaitingVerdict { .. }
            ),
        }
    }

    /// Reveal the correct answer: `Presenting(i) -> AwaitingVerdict(i)`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless a question is being presented.
    pub fn submit_answer(&mut self) -> Result<&str, SessionError> {
        let DrillState::Presenting { index } = self.state else {
            return Err(SessionError::InvalidState {
                action: "reveal the answer",
                state: self.state,
            });
        };
        self.record_at(index)?;
        self.state = DrillState::AwaitingVerdict { index };
        self.record_at(index).map(QuestionRecord::answer)
    }

    /// Record the user's verdict for the revealed question, persist it, and
    /// move on.
    ///
    /// Nothing changes if persisting fails; the caller may retry the verdict.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless awaiting a verdict, or
    /// `SessionError::Progress` if the log cannot be written.
    pub async fn record_verdict(&mut self, verdict: Verdict) -> Result<DrillState, SessionError> {
        let DrillState::AwaitingVerdict { index } = self.state else {
            return Err(SessionError::InvalidState {
                action: "record a verdict",
                state: self.state,
            });
        };
        let id = self.queue[index];
        self.store.record_verdict(id, verdict).await?;
        debug!(%id, ?verdict, position = index + 1, "verdict recorded");

        let next = index + 1;
        self.state = if next < self.queue.len() {
            DrillState::Presenting { index: next }
        } else {
            info!(
                pass = self.pass,
                known = self.store.current_known_count(),
                total = self.queue.len(),
                "pass finished"
            );
            DrillState::Finished
        };
        Ok(self.state)
    }

    /// The result of the finished pass, without consuming it.
    #[must_use]
    pub fn pass_report(&self) -> Option<PassReport> {
        self.is_finished()
            .then(|| PassReport::new(self.store.current_known_count(), self.queue.len()))
    }

    /// The result of the finished pass, returned only the first time it is asked for.
    pub fn take_report(&mut self) -> Option<PassReport> {
        if self.report_shown {
            return None;
        }
        let report = self.pass_report()?;
        self.report_shown = true;
        Some(report)
    }

    /// True when the pass is finished and some questions were missed.
    #[must_use]
    pub fn has_retry_offer(&self) -> bool {
        self.is_finished() && !self.store.current_unknown_ids().is_empty()
    }

    /// Start a retry pass over exactly the missed questions, in the order
    /// they were missed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless a retry is on offer.
    pub fn accept_retry(&mut self) -> Result<(), SessionError> {
        if !self.has_retry_offer() {
            return Err(SessionError::InvalidState {
                action: "start a retry pass",
                state: self.state,
            });
        }
        let missed = self.store.current_unknown_ids().to_vec();
        self.store.begin_retry_pass();
        self.queue = missed;
        self.pass += 1;
        self.report_shown = false;
        self.state = DrillState::Presenting { index: 0 };
        info!(
            pass = self.pass,
            questions = self.queue.len(),
            "retry pass started"
        );
        Ok(())
    }

    /// Leave a finished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the pass is finished.
    pub fn decline_retry(&mut self) -> Result<(), SessionError> {
        if !self.is_finished() {
            return Err(SessionError::InvalidState {
                action: "decline a retry",
                state: self.state,
            });
        }
        self.state = DrillState::Terminated;
        Ok(())
    }

    /// Abandon the session from any state. Every verdict is already persisted.
    pub fn terminate(&mut self) {
        if !self.is_terminated() {
            debug!(state = %self.state, "drill session terminated");
        }
        self.state = DrillState::Terminated;
    }
}

impl fmt::Debug for DrillSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrillSession")
            .field("state", &self.state)
            .field("pass", &self.pass)
            .field("queue_len", &self.queue.len())
            .field("categories", &self.categories)
            .field("report_shown", &self.report_shown)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
