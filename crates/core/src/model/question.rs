use crate::model::ids::QuestionId;

/// A single question/answer pair from the question bank.
///
/// Records are immutable once the bank is loaded; the bank hands out shared
/// references only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    id: QuestionId,
    category: String,
    question: String,
    answer: String,
}

impl QuestionRecord {
    #[must_use]
    pub fn new(
        id: QuestionId,
        category: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }
}
