use thiserror::Error;

use crate::model::{ProgressLogError, QuestionBankError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    QuestionBank(#[from] QuestionBankError),
    #[error(transparent)]
    ProgressLog(#[from] ProgressLogError),
}
