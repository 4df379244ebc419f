//! Error types for task store operations.

use std::io;

use thiserror::Error;

/// Errors returned by [`crate::todo_manager::TodoManager`].
///
/// A missing task id is not an error; lookups report it as `None` / `false`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Due date text did not match `YYYY-MM-DD`.
    #[error("invalid due date {0:?}, expected YYYY-MM-DD (e.g. 2025-11-12)")]
    InvalidDueDate(String),

    /// The largest stored id is `u32::MAX`, so no fresh id is left.
    #[error("no task IDs left to assign")]
    IdsExhausted,

    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to replace storage file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
