pub mod drag;
pub mod list_store;
pub mod moves;
pub mod session;

pub use drag::{DragSession, MoveIntent};
pub use list_store::{ListStore, Pending, Settled, Ticket};
pub use session::Session;

use crate::model::task::TaskId;
use crate::sync::SyncError;

/// Rejected before any state change or backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("list name cannot be empty")]
    EmptyName,
    #[error("cannot add subtask: maximum nesting depth ({limit}) reached")]
    MaxDepthReached { limit: usize },
    #[error("a drag is already in progress")]
    AlreadyDragging,
    #[error("task {task_id} is a subtask; only top-level tasks move between lists")]
    NestedMove { task_id: TaskId },
}

/// Error type for list store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Sync(#[from] SyncError),
}
