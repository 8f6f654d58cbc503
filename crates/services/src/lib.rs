#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod sessions;

pub use drill_core::Clock;
pub use sessions as session;

pub use bank::load_bank;
pub use error::{BankError, ProgressError, SessionError};
pub use sessions::{
    DrillSession, DrillState, PassProgress, PassReport, ProgressStore, QuestionPrompt,
    SessionPlanner,
};
