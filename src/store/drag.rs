use serde::{Deserialize, Serialize};

use crate::model::task::{ListId, TaskId};

use super::ValidationError;

/// Drag-and-drop gesture state. At most one drag exists at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DragSession {
    #[default]
    Idle,
    Dragging { task_id: TaskId, from_list: ListId },
}

/// A completed drop that should become a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub task_id: TaskId,
    pub from_list: ListId,
    pub to_list: ListId,
}

impl DragSession {
    pub fn begin(&mut self, task_id: TaskId, from_list: ListId) -> Result<(), ValidationError> {
        if self.is_dragging() {
            return Err(ValidationError::AlreadyDragging);
        }
        *self = DragSession::Dragging { task_id, from_list };
        Ok(())
    }

    /// End the drag over `destination`. Dropping back onto the source list
    /// ends the drag without a move.
    pub fn drop_on(&mut self, destination: ListId) -> Option<MoveIntent> {
        match std::mem::take(self) {
            DragSession::Dragging { task_id, from_list } if from_list != destination => {
                Some(MoveIntent {
                    task_id,
                    from_list,
                    to_list: destination,
                })
            }
            _ => None,
        }
    }

    /// Abandon the drag. True if one was in progress.
    pub fn cancel(&mut self) -> bool {
        std::mem::take(self).is_dragging()
    }

    /// Would dropping on `list` produce a move?
    pub fn would_move(&self, list: ListId) -> bool {
        matches!(self, DragSession::Dragging { from_list, .. } if *from_list != list)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSession::Dragging { .. })
    }

    pub fn dragged(&self) -> Option<(TaskId, ListId)> {
        match *self {
            DragSession::Dragging { task_id, from_list } => Some((task_id, from_list)),
            DragSession::Idle => None,
        }
    }
}
