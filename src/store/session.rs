//! Drives a `ListStore` against a backend.
//!
//! Each call runs one mutation to completion: optimistic change, request,
//! settle. The journal (when configured) records every refused request.

use std::path::PathBuf;

use tracing::debug;

use crate::io::journal;
use crate::model::task::{ListId, TaskId};
use crate::sync::normalize::normalize;
use crate::sync::{self, SyncClient};

use super::{DragSession, ListStore, Pending, Settled, StoreError};

pub struct Session<C> {
    client: C,
    store: ListStore,
    drag: DragSession,
    journal_dir: Option<PathBuf>,
}

impl<C: SyncClient> Session<C> {
    pub fn new(client: C, store: ListStore) -> Self {
        Session {
            client,
            store,
            drag: DragSession::default(),
            journal_dir: None,
        }
    }

    /// Record failed requests in the journal under `dir`
    pub fn with_journal(mut self, dir: PathBuf) -> Self {
        self.journal_dir = Some(dir);
        self
    }

    /// Resume a drag persisted by an earlier invocation
    pub fn with_drag(mut self, drag: DragSession) -> Self {
        self.drag = drag;
        self
    }

    pub fn store(&self) -> &ListStore {
        &self.store
    }

    pub fn drag(&self) -> DragSession {
        self.drag
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch everything and replace local state with it.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let response = self.client.fetch_all().await?;
        self.store.reconcile(normalize(response));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub async fn add_list(&mut self, name: &str) -> Result<ListId, StoreError> {
        let pending = self.store.add_list(name)?;
        match self.flush(pending).await? {
            Settled::ListCreated(list_id) => Ok(list_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn rename_list(&mut self, list_id: ListId, name: &str) -> Result<(), StoreError> {
        let pending = self.store.rename_list(list_id, name)?;
        self.flush(pending).await.map(drop)
    }

    pub async fn delete_list(&mut self, list_id: ListId) -> Result<(), StoreError> {
        let pending = self.store.delete_list(list_id)?;
        self.flush(pending).await.map(drop)
    }

    pub async fn delete_all_lists(&mut self) -> Result<(), StoreError> {
        let pending = self.store.delete_all_lists();
        self.flush(pending).await.map(drop)
    }

    pub async fn add_task(&mut self, list_id: ListId, text: &str) -> Result<TaskId, StoreError> {
        let pending = self.store.add_task(list_id, text)?;
        self.flush_created_task(pending).await
    }

    pub async fn add_subtask(
        &mut self,
        parent_id: TaskId,
        text: &str,
    ) -> Result<TaskId, StoreError> {
        let pending = self.store.add_subtask(parent_id, text)?;
        self.flush_created_task(pending).await
    }

    pub async fn toggle_complete(&mut self, task_id: TaskId) -> Result<(), StoreError> {
        let pending = self.store.toggle_complete(task_id)?;
        self.flush(pending).await.map(drop)
    }

    pub async fn edit_text(&mut self, task_id: TaskId, text: &str) -> Result<(), StoreError> {
        let pending = self.store.edit_text(task_id, text)?;
        self.flush(pending).await.map(drop)
    }

    pub async fn delete_task(&mut self, task_id: TaskId) -> Result<(), StoreError> {
        let pending = self.store.delete_task(task_id)?;
        self.flush(pending).await.map(drop)
    }

    /// False when source and destination are the same list.
    pub async fn move_task(
        &mut self,
        task_id: TaskId,
        from: ListId,
        to: ListId,
    ) -> Result<bool, StoreError> {
        match self.store.move_task(task_id, from, to)? {
            Some(pending) => self.flush(pending).await.map(|_| true),
            None => Ok(false),
        }
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    /// Pick up `task_id`. The source list defaults to the task's owner.
    /// Only top-level tasks can be dragged.
    pub fn begin_drag(&mut self, task_id: TaskId, from: Option<ListId>) -> Result<(), StoreError> {
        let from = match from {
            Some(list_id) => list_id,
            None => self
                .store
                .owner_of(task_id)
                .ok_or_else(|| StoreError::NotFound(format!("task {}", task_id)))?,
        };
        self.store.movable_index(task_id, from)?;
        self.drag.begin(task_id, from)?;
        debug!(%task_id, %from, "drag started");
        Ok(())
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel()
    }

    /// Finish the drag over `destination`. True if a move happened.
    pub async fn drop_on(&mut self, destination: ListId) -> Result<bool, StoreError> {
        match self.drag.drop_on(destination) {
            Some(intent) => {
                self.move_task(intent.task_id, intent.from_list, intent.to_list)
                    .await
            }
            None => {
                debug!(list_id = %destination, "drop without move");
                Ok(false)
            }
        }
    }

    /// End the server session. Consumes the session and its state.
    pub async fn logout(self) -> Result<(), StoreError> {
        self.client.logout().await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn flush(&mut self, pending: Pending) -> Result<Settled, StoreError> {
        let outcome = sync::send(&self.client, &pending.request).await;
        let settled = self.store.settle(pending.ticket, outcome);
        if let (Settled::Failed { error, reverted }, Some(dir)) = (&settled, &self.journal_dir) {
            journal::log_failure(dir, &pending.request, error, *reverted);
        }
        settled.into_result()
    }

    async fn flush_created_task(&mut self, pending: Pending) -> Result<TaskId, StoreError> {
        match self.flush(pending).await? {
            Settled::TaskCreated(task_id) => Ok(task_id),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(settled: Settled) -> StoreError {
    StoreError::Inconsistent(format!("unexpected reply: {:?}", settled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::model::task::TaskPatch;
    use crate::store::ValidationError;
    use crate::sync::SyncError;
    use crate::sync::wire::{AddTaskBody, FetchResponse, ListHeader, WireList, WireTask};

    /// Answers fetches from a fixed payload and fails everything else
    /// once `fail` is set.
    #[derive(Default)]
    struct Scripted {
        payload: FetchResponse,
        fail: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl Scripted {
        fn answer(&self, call: &'static str) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(SyncError::Network("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SyncClient for Scripted {
        async fn fetch_all(&self) -> Result<FetchResponse, SyncError> {
            self.calls.lock().unwrap().push("fetch");
            Ok(self.payload.clone())
        }
        async fn add_list(&self, name: &str) -> Result<ListHeader, SyncError> {
            self.answer("add_list")?;
            Ok(ListHeader {
                id: ListId(50),
                name: name.to_string(),
            })
        }
        async fn rename_list(&self, _: ListId, _: &str) -> Result<(), SyncError> {
            self.answer("rename_list")
        }
        async fn delete_list(&self, _: ListId) -> Result<(), SyncError> {
            self.answer("delete_list")
        }
        async fn delete_all_lists(&self) -> Result<(), SyncError> {
            self.answer("delete_all_lists")
        }
        async fn add_task(&self, body: &AddTaskBody) -> Result<WireTask, SyncError> {
            self.answer("add_task")?;
            Ok(WireTask {
                id: TaskId(500),
                text: body.text.clone(),
                completed: false,
                list_id: body.list_id,
                parent_id: body.parent_id,
                subtasks: None,
            })
        }
        async fn update_task(&self, _: TaskId, _: &TaskPatch) -> Result<(), SyncError> {
            self.answer("update_task")
        }
        async fn delete_task(&self, _: TaskId) -> Result<(), SyncError> {
            self.answer("delete_task")
        }
        async fn move_task(&self, _: TaskId, _: ListId) -> Result<(), SyncError> {
            self.answer("move_task")
        }
        async fn logout(&self) -> Result<(), SyncError> {
            self.answer("logout")
        }
    }

    fn payload() -> FetchResponse {
        FetchResponse {
            lists: vec![
                WireList {
                    id: ListId(1),
                    name: "Work".into(),
                    tasks: Some(vec![WireTask {
                        id: TaskId(10),
                        text: "Plan".into(),
                        completed: false,
                        list_id: Some(ListId(1)),
                        parent_id: None,
                        subtasks: None,
                    }]),
                },
                WireList {
                    id: ListId(2),
                    name: "Home".into(),
                    tasks: None,
                },
            ],
        }
    }

    async fn session(fail: bool) -> Session<Scripted> {
        let client = Scripted {
            payload: payload(),
            fail,
            ..Default::default()
        };
        let mut session = Session::new(client, ListStore::default());
        session.refresh().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_add_task_returns_server_id() {
        let mut session = session(false).await;
        let id = session.add_subtask(TaskId(10), "Outline").await.unwrap();
        assert_eq!(id, TaskId(500));
        assert_eq!(session.store().depth_of(id), Some(1));
        assert_eq!(
            *session.client().calls.lock().unwrap(),
            vec!["fetch", "add_task"]
        );
    }

    #[tokio::test]
    async fn test_drag_and_drop_moves() {
        let mut session = session(false).await;
        session.begin_drag(TaskId(10), None).unwrap();
        assert!(session.drag().would_move(ListId(2)));
        assert!(session.drop_on(ListId(2)).await.unwrap());
        assert_eq!(session.store().owner_of(TaskId(10)), Some(ListId(2)));
        assert_eq!(session.drag(), DragSession::Idle);
    }

    #[tokio::test]
    async fn test_drop_on_source_sends_nothing() {
        let mut session = session(false).await;
        session.begin_drag(TaskId(10), Some(ListId(1))).unwrap();
        assert!(!session.drop_on(ListId(1)).await.unwrap());
        assert_eq!(*session.client().calls.lock().unwrap(), vec!["fetch"]);
    }

    #[tokio::test]
    async fn test_failure_is_journaled_and_reverted() {
        let tmp = TempDir::new().unwrap();
        let mut session = session(true).await.with_journal(tmp.path().to_path_buf());
        let before = session.store().snapshot();

        let err = session.move_task(TaskId(10), ListId(1), ListId(2)).await;
        assert_eq!(err, Err(StoreError::Sync(SyncError::Network("offline".into()))));
        assert_eq!(session.store().snapshot(), before);

        let entries = journal::read_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, "move-task");
        assert!(entries[0].reverted);
    }

    #[tokio::test]
    async fn test_begin_drag_unknown_task() {
        let mut session = session(false).await;
        assert!(matches!(
            session.begin_drag(TaskId(99), None),
            Err(StoreError::NotFound(_))
        ));
        assert!(!session.drag().is_dragging());
    }

    #[tokio::test]
    async fn test_begin_drag_refuses_subtask() {
        let mut session = session(false).await;
        let sub = session.add_subtask(TaskId(10), "Outline").await.unwrap();
        assert_eq!(
            session.begin_drag(sub, None),
            Err(StoreError::Validation(ValidationError::NestedMove { task_id: sub }))
        );
        assert!(!session.drag().is_dragging());
    }

    #[tokio::test]
    async fn test_logout() {
        let session = session(false).await;
        assert!(session.logout().await.is_ok());
    }
}
