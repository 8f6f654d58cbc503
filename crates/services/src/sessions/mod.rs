mod plan;
mod progress;
mod service;
mod store;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::SessionPlanner;
pub use progress::{PassProgress, PassReport, QuestionPrompt};
pub use service::{DrillSession, DrillState};
pub use store::ProgressStore;
