use serde::{Deserialize, Serialize};

use super::task::{ListId, TaskNode};

/// A named list owning a top-level sequence of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: ListId,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
}

impl TaskList {
    /// Create an empty list
    pub fn new(id: ListId, name: impl Into<String>) -> Self {
        TaskList {
            id,
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    /// Number of nodes at every depth
    pub fn task_count(&self) -> usize {
        crate::ops::tree_ops::count_nodes(&self.tasks)
    }

    /// Number of completed nodes at every depth
    pub fn completed_count(&self) -> usize {
        let mut n = 0;
        crate::ops::tree_ops::for_each_node(&self.tasks, &mut |node, _| {
            if node.completed {
                n += 1;
            }
        });
        n
    }
}
