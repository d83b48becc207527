//! JSON shapes exchanged with the task server.

use serde::{Deserialize, Serialize};

use crate::model::task::{ListId, TaskId};

/// A task as the server sends it. Either pre-nested (`subtasks` filled) or
/// flat (`parent_id` links); `sync::normalize` accepts both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTask {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<WireTask>>,
}

/// A list with its tasks, as in `GET /tasks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireList {
    pub id: ListId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<WireTask>>,
}

/// `GET /tasks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    #[serde(default)]
    pub lists: Vec<WireList>,
}

/// `{ id, name }` as returned by `POST /add_list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHeader {
    pub id: ListId,
    pub name: String,
}

/// `POST /add_list`
#[derive(Debug, Clone, Deserialize)]
pub struct AddListResponse {
    pub list: ListHeader,
}

/// `POST /add_task`
#[derive(Debug, Clone, Deserialize)]
pub struct AddTaskResponse {
    pub task: WireTask,
}

/// Body of `POST /add_list` and `PUT /update_list/:id`
#[derive(Debug, Clone, Serialize)]
pub struct NameBody<'a> {
    pub name: &'a str,
}

/// Body of `POST /add_task`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddTaskBody {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
}

/// Body of `PUT /move_task/:id`
#[derive(Debug, Clone, Serialize)]
pub struct MoveBody {
    pub list_id: ListId,
}

/// Non-2xx bodies look like `{ "error": "..." }`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_nested() {
        let json = r#"{
            "lists": [
                {"id": 1, "name": "Work", "tasks": [
                    {"id": 10, "text": "Plan", "completed": false, "level": 1,
                     "subtasks": [{"id": 11, "text": "Outline", "completed": true, "subtasks": []}]}
                ]},
                {"id": 2, "name": "Home", "tasks": null}
            ]
        }"#;
        let resp: FetchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.lists.len(), 2);
        let task = &resp.lists[0].tasks.as_ref().unwrap()[0];
        assert_eq!(task.id, TaskId(10));
        assert!(task.subtasks.as_ref().unwrap()[0].completed);
        assert!(resp.lists[1].tasks.is_none());
    }

    #[test]
    fn test_fetch_response_missing_lists() {
        let resp: FetchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.lists.is_empty());
    }

    #[test]
    fn test_add_task_body_omits_absent_ids() {
        let body = AddTaskBody {
            text: "Draft outline".into(),
            list_id: None,
            parent_id: Some(TaskId(4)),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"text":"Draft outline","parent_id":4}"#
        );
    }

    #[test]
    fn test_add_responses() {
        let list: AddListResponse =
            serde_json::from_str(r#"{"message": "ok", "list": {"id": 3, "name": "Errands"}}"#)
                .unwrap();
        assert_eq!(list.list.id, ListId(3));

        let task: AddTaskResponse = serde_json::from_str(
            r#"{"message": "ok", "task": {"id": 9, "text": "Milk", "completed": false, "level": 1, "subtasks": []}}"#,
        )
        .unwrap();
        assert_eq!(task.task.text, "Milk");
        assert_eq!(task.task.list_id, None);
    }
}
