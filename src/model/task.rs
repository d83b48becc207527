use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-assigned task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

/// Backend-assigned list identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A task or subtask. Owns its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    /// Owning list. Every node of a list's tree carries the same value.
    pub list_id: ListId,
    /// Children in display order. Empty, never absent.
    #[serde(default)]
    pub subtasks: Vec<TaskNode>,
}

impl TaskNode {
    /// Create a fresh, incomplete leaf node
    pub fn new(id: TaskId, list_id: ListId, text: impl Into<String>) -> Self {
        TaskNode {
            id,
            text: text.into(),
            completed: false,
            list_id,
            subtasks: Vec::new(),
        }
    }

    /// Copy of this node's own fields with a replacement child sequence.
    pub fn with_subtasks(&self, subtasks: Vec<TaskNode>) -> Self {
        TaskNode {
            id: self.id,
            text: self.text.clone(),
            completed: self.completed,
            list_id: self.list_id,
            subtasks,
        }
    }
}

/// A partial set of task fields. Merged into a node by `update_node` and
/// sent as-is as the body of `PUT /update_task/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
}

impl TaskPatch {
    pub fn text(text: impl Into<String>) -> Self {
        TaskPatch {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.list_id.is_none()
    }

    /// Merge the present fields into `node`.
    pub fn apply_to(&self, node: &mut TaskNode) {
        if let Some(text) = &self.text {
            node.text = text.clone();
        }
        if let Some(completed) = self.completed {
            node.completed = completed;
        }
        if let Some(list_id) = self.list_id {
            node.list_id = list_id;
        }
    }

    /// The values `node` currently holds for the fields this patch touches.
    /// Applying the result undoes `self`.
    pub fn inverse_for(&self, node: &TaskNode) -> TaskPatch {
        TaskPatch {
            text: self.text.as_ref().map(|_| node.text.clone()),
            completed: self.completed.map(|_| node.completed),
            list_id: self.list_id.map(|_| node.list_id),
        }
    }

    /// Keep only the fields whose value in `node` still equals this patch.
    pub fn still_applied(&self, node: &TaskNode) -> TaskPatch {
        TaskPatch {
            text: self.text.clone().filter(|t| *t == node.text),
            completed: self.completed.filter(|c| *c == node.completed),
            list_id: self.list_id.filter(|l| *l == node.list_id),
        }
    }
}
