#![forbid(unsafe_code)]

pub mod json;
pub mod repository;
pub mod sqlite;

pub use repository::{InMemoryRepository, ProgressLogRecord, ProgressRepository, Storage, StorageError};
