mod bank;
mod ids;
mod progress;
mod question;

pub use bank::{FIELD_DELIMITER, QuestionBank, QuestionBankError, strip_non_printable};
pub use ids::{ParseIdError, QuestionId};
pub use progress::{LifetimeTotals, ProgressEntry, ProgressLog, ProgressLogError, Verdict};
pub use question::QuestionRecord;
