//! Moving a task between lists.
//!
//! Only top-level tasks change lists, and they land at the destination's top
//! level. The removal from the source and the append at the destination are
//! committed together. A failed request carries the task, with whatever
//! subtree it has by then, back to its old slot. Anything else that changed
//! in the meantime stays as it is.

use tracing::{debug, warn};

use crate::model::task::{ListId, TaskId};
use crate::ops::tree_ops;
use crate::sync::SyncRequest;

use super::list_store::{ListStore, Pending, Revert, adopt, list_not_found};
use super::{StoreError, ValidationError};

impl ListStore {
    /// Move `task_id` (with its subtree) from `from` to the top level of
    /// `to`. `Ok(None)` when source and destination are the same list.
    pub fn move_task(
        &mut self,
        task_id: TaskId,
        from: ListId,
        to: ListId,
    ) -> Result<Option<Pending>, StoreError> {
        if from == to {
            debug!(%task_id, list_id = %from, "move onto the same list ignored");
            return Ok(None);
        }
        for list_id in [from, to] {
            if !self.lists.contains_key(&list_id) {
                return Err(list_not_found(list_id));
            }
        }
        let index = self.movable_index(task_id, from)?;

        let source = self.lists.get_mut(&from).ok_or_else(|| list_not_found(from))?;
        let Some(mut moved) = tree_ops::find_node(&source.tasks, task_id).cloned() else {
            return Err(not_in_list(task_id, from));
        };
        let remaining = tree_ops::changed(tree_ops::remove_subtree(&source.tasks, task_id));
        adopt(source, remaining);
        tree_ops::relist(&mut moved, to);
        if let Some(dest) = self.lists.get_mut(&to) {
            dest.tasks.push(moved);
        }
        debug!(%task_id, %from, %to, "moved task");

        Ok(Some(self.issue(
            SyncRequest::MoveTask {
                task_id,
                list_id: to,
            },
            Revert::Move {
                task_id,
                from,
                index,
            },
        )))
    }

    /// Position of `task_id` among the top-level tasks of `from`. Subtasks
    /// cannot change lists.
    pub fn movable_index(&self, task_id: TaskId, from: ListId) -> Result<usize, StoreError> {
        let source = self.lists.get(&from).ok_or_else(|| list_not_found(from))?;
        match tree_ops::locate(&source.tasks, task_id) {
            None => Err(not_in_list(task_id, from)),
            Some(location) if location.depth > 0 => {
                Err(ValidationError::NestedMove { task_id }.into())
            }
            Some(location) => Ok(location.index),
        }
    }

    /// Carry a moved task back to `index` in `from`. Nothing happens when the
    /// task is gone, already back home, or its old list no longer exists.
    pub(super) fn revert_move(&mut self, task_id: TaskId, from: ListId, index: usize) -> bool {
        let Some((current, _)) = self.locate(task_id) else {
            debug!(%task_id, "moved task is gone, nothing to restore");
            return false;
        };
        if current == from || !self.lists.contains_key(&from) {
            return false;
        }
        let Some(list) = self.lists.get_mut(&current) else {
            return false;
        };
        let Some(mut node) = tree_ops::find_node(&list.tasks, task_id).cloned() else {
            return false;
        };
        let remaining = tree_ops::changed(tree_ops::remove_subtree(&list.tasks, task_id));
        adopt(list, remaining);
        tree_ops::relist(&mut node, from);
        let Some(source) = self.lists.get_mut(&from) else {
            return false;
        };
        let restored = tree_ops::changed(tree_ops::insert_at(&source.tasks, None, index, node));
        adopt(source, restored);
        warn!(%task_id, %from, "moved task back after failed move");
        true
    }
}

fn not_in_list(task_id: TaskId, list_id: ListId) -> StoreError {
    StoreError::Inconsistent(format!("task {} is not in list {}", task_id, list_id))
}
