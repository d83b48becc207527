use async_trait::async_trait;

use crate::model::task::{ListId, TaskId, TaskPatch};

use super::wire::{AddTaskBody, FetchResponse, ListHeader, WireTask};

/// Error type for backend calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The request could not be sent or the response could not be read
    #[error("network failure: {0}")]
    Network(String),
    /// The server answered with a non-2xx status
    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

/// A backend call queued by a store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    AddList { name: String },
    RenameList { list_id: ListId, name: String },
    DeleteList { list_id: ListId },
    DeleteAllLists,
    AddTask(AddTaskBody),
    UpdateTask { task_id: TaskId, patch: TaskPatch },
    DeleteTask { task_id: TaskId },
    MoveTask { task_id: TaskId, list_id: ListId },
}

impl SyncRequest {
    /// Short name used in logs and the journal
    pub fn kind(&self) -> &'static str {
        match self {
            SyncRequest::AddList { .. } => "add-list",
            SyncRequest::RenameList { .. } => "rename-list",
            SyncRequest::DeleteList { .. } => "delete-list",
            SyncRequest::DeleteAllLists => "delete-all-lists",
            SyncRequest::AddTask(body) if body.parent_id.is_some() => "add-subtask",
            SyncRequest::AddTask(_) => "add-task",
            SyncRequest::UpdateTask { .. } => "update-task",
            SyncRequest::DeleteTask { .. } => "delete-task",
            SyncRequest::MoveTask { .. } => "move-task",
        }
    }

    /// `key: value` pairs naming the request's targets
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        match self {
            SyncRequest::AddList { name } => fields.push(("name".into(), name.clone())),
            SyncRequest::RenameList { list_id, name } => {
                fields.push(("list".into(), list_id.to_string()));
                fields.push(("name".into(), name.clone()));
            }
            SyncRequest::DeleteList { list_id } => {
                fields.push(("list".into(), list_id.to_string()))
            }
            SyncRequest::DeleteAllLists => {}
            SyncRequest::AddTask(body) => {
                if let Some(list_id) = body.list_id {
                    fields.push(("list".into(), list_id.to_string()));
                }
                if let Some(parent_id) = body.parent_id {
                    fields.push(("parent".into(), parent_id.to_string()));
                }
                fields.push(("text".into(), body.text.clone()));
            }
            SyncRequest::UpdateTask { task_id, patch } => {
                fields.push(("task".into(), task_id.to_string()));
                if let Some(text) = &patch.text {
                    fields.push(("text".into(), text.clone()));
                }
                if let Some(completed) = patch.completed {
                    fields.push(("completed".into(), completed.to_string()));
                }
                if let Some(list_id) = patch.list_id {
                    fields.push(("list".into(), list_id.to_string()));
                }
            }
            SyncRequest::DeleteTask { task_id } => {
                fields.push(("task".into(), task_id.to_string()))
            }
            SyncRequest::MoveTask { task_id, list_id } => {
                fields.push(("task".into(), task_id.to_string()));
                fields.push(("to".into(), list_id.to_string()));
            }
        }
        fields
    }
}

/// What a confirmed request returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReply {
    /// 2xx with nothing the store needs
    Ok,
    /// A list created by `POST /add_list`
    List(ListHeader),
    /// A task created by `POST /add_task`
    Task(WireTask),
}

/// The backend contract. `HttpClient` talks to a real server; tests
/// script their own implementations.
#[async_trait]
pub trait SyncClient: Send + Sync {
    async fn fetch_all(&self) -> Result<FetchResponse, SyncError>;
    async fn add_list(&self, name: &str) -> Result<ListHeader, SyncError>;
    async fn rename_list(&self, list_id: ListId, name: &str) -> Result<(), SyncError>;
    async fn delete_list(&self, list_id: ListId) -> Result<(), SyncError>;
    async fn delete_all_lists(&self) -> Result<(), SyncError>;
    async fn add_task(&self, body: &AddTaskBody) -> Result<WireTask, SyncError>;
    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), SyncError>;
    async fn delete_task(&self, task_id: TaskId) -> Result<(), SyncError>;
    async fn move_task(&self, task_id: TaskId, list_id: ListId) -> Result<(), SyncError>;
    async fn logout(&self) -> Result<(), SyncError>;
}

/// Issue a queued request against `client`.
pub async fn send<C: SyncClient + ?Sized>(
    client: &C,
    request: &SyncRequest,
) -> Result<SyncReply, SyncError> {
    match request {
        SyncRequest::AddList { name } => client.add_list(name).await.map(SyncReply::List),
        SyncRequest::RenameList { list_id, name } => {
            client.rename_list(*list_id, name).await.map(|_| SyncReply::Ok)
        }
        SyncRequest::DeleteList { list_id } => {
            client.delete_list(*list_id).await.map(|_| SyncReply::Ok)
        }
        SyncRequest::DeleteAllLists => client.delete_all_lists().await.map(|_| SyncReply::Ok),
        SyncRequest::AddTask(body) => client.add_task(body).await.map(SyncReply::Task),
        SyncRequest::UpdateTask { task_id, patch } => {
            client.update_task(*task_id, patch).await.map(|_| SyncReply::Ok)
        }
        SyncRequest::DeleteTask { task_id } => {
            client.delete_task(*task_id).await.map(|_| SyncReply::Ok)
        }
        SyncRequest::MoveTask { task_id, list_id } => {
            client.move_task(*task_id, *list_id).await.map(|_| SyncReply::Ok)
        }
    }
}
