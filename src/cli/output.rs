use serde::Serialize;

use crate::model::list::TaskList;
use crate::model::task::{ListId, TaskNode};
use crate::ops::check::{CheckError, CheckResult, CheckWarning};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListSummaryJson {
    pub id: ListId,
    pub name: String,
    pub tasks: usize,
    pub completed: usize,
}

pub fn list_summary_json(list: &TaskList) -> ListSummaryJson {
    ListSummaryJson {
        id: list.id,
        name: list.name.clone(),
        tasks: list.task_count(),
        completed: list.completed_count(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// `[x] 12 text`
pub fn format_task_line(task: &TaskNode) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    format!("[{}] {} {}", mark, task.id, task.text)
}

/// Format a task with its subtasks, indented two spaces per level
pub fn format_task_tree(task: &TaskNode, indent: usize) -> Vec<String> {
    let mut lines = vec![format!("{}{}", "  ".repeat(indent), format_task_line(task))];
    for sub in &task.subtasks {
        lines.extend(format_task_tree(sub, indent + 1));
    }
    lines
}

/// Header line plus the whole tree
pub fn format_list(list: &TaskList) -> Vec<String> {
    let mut lines = vec![format!("{} {}", list.id, list.name)];
    if list.tasks.is_empty() {
        lines.push("  (empty)".to_string());
    }
    for task in &list.tasks {
        lines.extend(format_task_tree(task, 1));
    }
    lines
}

/// One row of `tn lists`
pub fn format_list_summary(list: &TaskList) -> String {
    format!(
        "{:>4}  {}  ({}/{} done)",
        list.id.0,
        list.name,
        list.completed_count(),
        list.task_count()
    )
}

pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(match err {
                CheckError::DuplicateId { task_id, list_ids } => format!(
                    "  task {} appears in lists: {}",
                    task_id,
                    list_ids
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                CheckError::TooDeep {
                    list_id,
                    task_id,
                    depth,
                    max_depth,
                } => format!(
                    "  [{}] task {} is at depth {} (max {})",
                    list_id, task_id, depth, max_depth
                ),
                CheckError::WrongList {
                    list_id,
                    task_id,
                    recorded,
                } => format!(
                    "  [{}] task {} records list {}",
                    list_id, task_id, recorded
                ),
            });
        }
    }
    if !result.warnings.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warn in &result.warnings {
            lines.push(match warn {
                CheckWarning::EmptyText { list_id, task_id } => {
                    format!("  [{}] task {} has no text", list_id, task_id)
                }
                CheckWarning::EmptyListName { list_id } => {
                    format!("  list {} has no name", list_id)
                }
            });
        }
    }
    lines.push(
        if result.valid {
            "✓ lists are valid"
        } else {
            "✗ lists have errors"
        }
        .to_string(),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskId;
    use pretty_assertions::assert_eq;

    fn list() -> TaskList {
        let mut done = TaskNode::new(TaskId(11), ListId(1), "Outline");
        done.completed = true;
        TaskList {
            id: ListId(1),
            name: "Work".into(),
            tasks: vec![
                TaskNode {
                    subtasks: vec![done],
                    ..TaskNode::new(TaskId(10), ListId(1), "Plan")
                },
                TaskNode::new(TaskId(20), ListId(1), "Ship"),
            ],
        }
    }

    #[test]
    fn test_format_list() {
        assert_eq!(
            format_list(&list()),
            vec!["1 Work", "  [ ] 10 Plan", "    [x] 11 Outline", "  [ ] 20 Ship"]
        );
        assert_eq!(
            format_list(&TaskList::new(ListId(2), "Home")),
            vec!["2 Home", "  (empty)"]
        );
    }

    #[test]
    fn test_format_list_summary() {
        assert_eq!(format_list_summary(&list()), "   1  Work  (1/3 done)");
        let json = serde_json::to_value(list_summary_json(&list())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "name": "Work", "tasks": 3, "completed": 1})
        );
    }

    #[test]
    fn test_format_check() {
        let clean = CheckResult {
            valid: true,
            errors: vec![],
            warnings: vec![],
        };
        assert_eq!(format_check(&clean), vec!["✓ lists are valid"]);

        let result = CheckResult {
            valid: false,
            errors: vec![CheckError::DuplicateId {
                task_id: TaskId(4),
                list_ids: vec![ListId(1), ListId(2)],
            }],
            warnings: vec![CheckWarning::EmptyListName { list_id: ListId(3) }],
        };
        assert_eq!(
            format_check(&result),
            vec![
                "Errors:",
                "  task 4 appears in lists: 1, 2",
                "",
                "Warnings:",
                "  list 3 has no name",
                "✗ lists have errors",
            ]
        );
    }
}
