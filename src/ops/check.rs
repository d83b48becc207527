use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::list::TaskList;
use crate::model::task::{ListId, TaskId, TaskNode};

/// Structured result from `tn check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A broken forest invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// The same task id occurs more than once across all lists
    #[serde(rename = "duplicate_id")]
    DuplicateId {
        task_id: TaskId,
        list_ids: Vec<ListId>,
    },
    /// A node sits deeper than the configured limit
    #[serde(rename = "too_deep")]
    TooDeep {
        list_id: ListId,
        task_id: TaskId,
        depth: usize,
        max_depth: usize,
    },
    /// A node's list_id disagrees with the list that holds it
    #[serde(rename = "wrong_list")]
    WrongList {
        list_id: ListId,
        task_id: TaskId,
        recorded: ListId,
    },
}

/// A non-critical observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    #[serde(rename = "empty_text")]
    EmptyText { list_id: ListId, task_id: TaskId },
    #[serde(rename = "empty_list_name")]
    EmptyListName { list_id: ListId },
}

/// Validate a forest of lists. Read-only.
///
/// Checks performed:
/// 1. Task ids are unique across every list and depth
/// 2. No node is deeper than `max_depth`
/// 3. Every node records the list that holds it
/// 4. Warnings for blank task text and blank list names
pub fn check_lists<'a>(lists: impl IntoIterator<Item = &'a TaskList>, max_depth: usize) -> CheckResult {
    let mut result = CheckResult::default();
    let mut seen: BTreeMap<TaskId, Vec<ListId>> = BTreeMap::new();

    for list in lists {
        if list.name.trim().is_empty() {
            result
                .warnings
                .push(CheckWarning::EmptyListName { list_id: list.id });
        }
        check_tree(&list.tasks, list.id, 0, max_depth, &mut seen, &mut result);
    }

    let duplicates: Vec<CheckError> = seen
        .into_iter()
        .filter(|(_, list_ids)| list_ids.len() > 1)
        .map(|(task_id, list_ids)| CheckError::DuplicateId { task_id, list_ids })
        .collect();
    result.errors.splice(0..0, duplicates);

    result.valid = result.errors.is_empty();
    result
}

fn check_tree(
    tree: &[TaskNode],
    list_id: ListId,
    depth: usize,
    max_depth: usize,
    seen: &mut BTreeMap<TaskId, Vec<ListId>>,
    result: &mut CheckResult,
) {
    for node in tree {
        seen.entry(node.id).or_default().push(list_id);

        if depth > max_depth {
            result.errors.push(CheckError::TooDeep {
                list_id,
                task_id: node.id,
                depth,
                max_depth,
            });
        }
        if node.list_id != list_id {
            result.errors.push(CheckError::WrongList {
                list_id,
                task_id: node.id,
                recorded: node.list_id,
            });
        }
        if node.text.trim().is_empty() {
            result.warnings.push(CheckWarning::EmptyText {
                list_id,
                task_id: node.id,
            });
        }

        check_tree(&node.subtasks, list_id, depth + 1, max_depth, seen, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u64, list: u64) -> TaskNode {
        TaskNode::new(TaskId(id), ListId(list), format!("task {}", id))
    }

    #[test]
    fn test_clean_forest_is_valid() {
        let mut a = TaskList::new(ListId(1), "Work");
        let mut parent = leaf(1, 1);
        parent.subtasks.push(leaf(2, 1));
        a.tasks.push(parent);
        let b = TaskList::new(ListId(2), "Home");

        let result = check_lists([&a, &b], 3);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_ids_across_lists() {
        let mut a = TaskList::new(ListId(1), "Work");
        a.tasks.push(leaf(7, 1));
        let mut b = TaskList::new(ListId(2), "Home");
        b.tasks.push(leaf(7, 2));

        let result = check_lists([&a, &b], 3);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![CheckError::DuplicateId {
                task_id: TaskId(7),
                list_ids: vec![ListId(1), ListId(2)],
            }]
        );
    }

    #[test]
    fn test_too_deep_and_wrong_list() {
        let mut a = TaskList::new(ListId(1), "Work");
        let mut top = leaf(1, 1);
        let mut mid = leaf(2, 1);
        mid.subtasks.push(leaf(3, 9));
        top.subtasks.push(mid);
        a.tasks.push(top);

        let result = check_lists([&a], 1);
        assert!(!result.valid);
        assert!(result.errors.contains(&CheckError::TooDeep {
            list_id: ListId(1),
            task_id: TaskId(3),
            depth: 2,
            max_depth: 1,
        }));
        assert!(result.errors.contains(&CheckError::WrongList {
            list_id: ListId(1),
            task_id: TaskId(3),
            recorded: ListId(9),
        }));
    }

    #[test]
    fn test_blank_text_is_a_warning() {
        let mut a = TaskList::new(ListId(1), " ");
        a.tasks.push(TaskNode::new(TaskId(1), ListId(1), ""));
        let result = check_lists([&a], 3);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_check_result_json_shape() {
        let mut a = TaskList::new(ListId(1), "Work");
        a.tasks.push(leaf(1, 2));
        let result = check_lists([&a], 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["type"], "wrong_list");
    }
}
