//! The authoritative in-memory forest of lists and tasks.
//!
//! Every mutation happens in two halves. The entry point validates, applies
//! the optimistic change and hands back a [`Pending`] request. Whoever sends
//! the request reports the outcome through [`ListStore::settle`], in any
//! order relative to other tickets. Creations only touch state on settle,
//! since their ids come from the server.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::model::config::{Config, RollbackPolicy};
use crate::model::list::TaskList;
use crate::model::task::{ListId, TaskId, TaskNode, TaskPatch};
use crate::ops::tree_ops::{self, NodeLocation};
use crate::sync::normalize;
use crate::sync::wire::{AddTaskBody, ListHeader, WireTask};
use crate::sync::{SyncError, SyncReply, SyncRequest};

use super::{StoreError, ValidationError};

/// Identifies one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A backend request waiting to be sent and settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub ticket: Ticket,
    pub request: SyncRequest,
}

/// Result of settling a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Confirmed,
    ListCreated(ListId),
    TaskCreated(TaskId),
    /// The backend refused or never answered. `reverted` tells whether local
    /// state was rolled back.
    Failed { error: SyncError, reverted: bool },
    /// Unknown or already-settled ticket
    Ignored,
}

impl Settled {
    pub fn into_result(self) -> Result<Settled, StoreError> {
        match self {
            Settled::Failed { error, .. } => Err(StoreError::Sync(error)),
            other => Ok(other),
        }
    }
}

/// How to undo an optimistic change if the backend refuses it
#[derive(Debug, Clone)]
pub(super) enum Revert {
    /// Nothing was applied locally
    Nothing,
    Patch {
        task_id: TaskId,
        applied: TaskPatch,
        previous: TaskPatch,
    },
    Reinsert {
        list_id: ListId,
        location: NodeLocation,
        node: TaskNode,
    },
    Rename {
        list_id: ListId,
        applied: String,
        previous: String,
    },
    RestoreList {
        index: usize,
        list: TaskList,
    },
    RestoreAll(Vec<TaskList>),
    /// A top-level task that left `from` at `index`
    Move {
        task_id: TaskId,
        from: ListId,
        index: usize,
    },
}

#[derive(Debug, Clone)]
struct InFlight {
    request: SyncRequest,
    revert: Revert,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct ListStore {
    pub(super) lists: IndexMap<ListId, TaskList>,
    max_depth: usize,
    rollback: RollbackPolicy,
    next_ticket: u64,
    epoch: u64,
    in_flight: BTreeMap<Ticket, InFlight>,
}

impl Default for ListStore {
    fn default() -> Self {
        ListStore::from_config(&Config::default())
    }
}

impl ListStore {
    pub fn new(max_depth: usize, rollback: RollbackPolicy) -> Self {
        ListStore {
            lists: IndexMap::new(),
            max_depth,
            rollback,
            next_ticket: 1,
            epoch: 0,
            in_flight: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        ListStore::new(config.tree.max_depth, config.sync.rollback)
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    /// Lists in display order
    pub fn lists(&self) -> impl Iterator<Item = &TaskList> {
        self.lists.values()
    }

    pub fn list(&self, list_id: ListId) -> Option<&TaskList> {
        self.lists.get(&list_id)
    }

    pub fn find_task(&self, task_id: TaskId) -> Option<&TaskNode> {
        self.lists
            .values()
            .find_map(|list| tree_ops::find_node(&list.tasks, task_id))
    }

    /// The list whose tree contains `task_id`
    pub fn owner_of(&self, task_id: TaskId) -> Option<ListId> {
        self.lists
            .values()
            .find(|list| tree_ops::contains(&list.tasks, task_id))
            .map(|list| list.id)
    }

    /// 0 for a top-level task
    pub fn depth_of(&self, task_id: TaskId) -> Option<usize> {
        self.lists
            .values()
            .find_map(|list| tree_ops::depth_of(&list.tasks, task_id))
    }

    /// Number of requests issued but not yet settled
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Owned copy of the forest in display order
    pub fn snapshot(&self) -> Vec<TaskList> {
        self.lists.values().cloned().collect()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn rollback(&self) -> RollbackPolicy {
        self.rollback
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    pub fn add_list(&mut self, name: &str) -> Result<Pending, StoreError> {
        let name = non_empty(name, ValidationError::EmptyName)?;
        Ok(self.issue(SyncRequest::AddList { name }, Revert::Nothing))
    }

    pub fn rename_list(&mut self, list_id: ListId, name: &str) -> Result<Pending, StoreError> {
        let name = non_empty(name, ValidationError::EmptyName)?;
        let list = self
            .lists
            .get_mut(&list_id)
            .ok_or_else(|| list_not_found(list_id))?;
        let previous = std::mem::replace(&mut list.name, name.clone());
        debug!(%list_id, from = %previous, to = %name, "renamed list");
        Ok(self.issue(
            SyncRequest::RenameList {
                list_id,
                name: name.clone(),
            },
            Revert::Rename {
                list_id,
                applied: name,
                previous,
            },
        ))
    }

    pub fn delete_list(&mut self, list_id: ListId) -> Result<Pending, StoreError> {
        let index = self
            .lists
            .get_index_of(&list_id)
            .ok_or_else(|| list_not_found(list_id))?;
        let Some((_, list)) = self.lists.shift_remove_index(index) else {
            return Err(list_not_found(list_id));
        };
        debug!(%list_id, tasks = list.task_count(), "deleted list");
        Ok(self.issue(
            SyncRequest::DeleteList { list_id },
            Revert::RestoreList { index, list },
        ))
    }

    pub fn delete_all_lists(&mut self) -> Pending {
        let previous: Vec<TaskList> = std::mem::take(&mut self.lists).into_values().collect();
        debug!(lists = previous.len(), "cleared all lists");
        self.issue(SyncRequest::DeleteAllLists, Revert::RestoreAll(previous))
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn add_task(&mut self, list_id: ListId, text: &str) -> Result<Pending, StoreError> {
        let text = non_empty(text, ValidationError::EmptyText)?;
        if !self.lists.contains_key(&list_id) {
            return Err(list_not_found(list_id));
        }
        Ok(self.issue(
            SyncRequest::AddTask(AddTaskBody {
                text,
                list_id: Some(list_id),
                parent_id: None,
            }),
            Revert::Nothing,
        ))
    }

    pub fn add_subtask(&mut self, parent_id: TaskId, text: &str) -> Result<Pending, StoreError> {
        let text = non_empty(text, ValidationError::EmptyText)?;
        let (list_id, location) = self
            .locate(parent_id)
            .ok_or_else(|| task_not_found(parent_id))?;
        if location.depth >= self.max_depth {
            return Err(ValidationError::MaxDepthReached {
                limit: self.max_depth,
            }
            .into());
        }
        Ok(self.issue(
            SyncRequest::AddTask(AddTaskBody {
                text,
                list_id: Some(list_id),
                parent_id: Some(parent_id),
            }),
            Revert::Nothing,
        ))
    }

    pub fn toggle_complete(&mut self, task_id: TaskId) -> Result<Pending, StoreError> {
        let node = self
            .find_task(task_id)
            .ok_or_else(|| task_not_found(task_id))?;
        let patch = TaskPatch::completed(!node.completed);
        self.patch_task(task_id, patch)
    }

    pub fn edit_text(&mut self, task_id: TaskId, text: &str) -> Result<Pending, StoreError> {
        let text = non_empty(text, ValidationError::EmptyText)?;
        self.patch_task(task_id, TaskPatch::text(text))
    }

    fn patch_task(&mut self, task_id: TaskId, patch: TaskPatch) -> Result<Pending, StoreError> {
        let owner = self.owner_of(task_id).ok_or_else(|| task_not_found(task_id))?;
        let list = self
            .lists
            .get_mut(&owner)
            .ok_or_else(|| list_not_found(owner))?;
        let previous = tree_ops::find_node(&list.tasks, task_id)
            .map(|node| patch.inverse_for(node))
            .ok_or_else(|| task_not_found(task_id))?;
        let next = tree_ops::changed(tree_ops::update_node(&list.tasks, task_id, &patch));
        adopt(list, next);
        debug!(%task_id, ?patch, "patched task");
        Ok(self.issue(
            SyncRequest::UpdateTask {
                task_id,
                patch: patch.clone(),
            },
            Revert::Patch {
                task_id,
                applied: patch,
                previous,
            },
        ))
    }

    pub fn delete_task(&mut self, task_id: TaskId) -> Result<Pending, StoreError> {
        let (list_id, location) = self
            .locate(task_id)
            .ok_or_else(|| task_not_found(task_id))?;
        let list = self
            .lists
            .get_mut(&list_id)
            .ok_or_else(|| list_not_found(list_id))?;
        let node = tree_ops::find_node(&list.tasks, task_id)
            .cloned()
            .ok_or_else(|| task_not_found(task_id))?;
        let next = tree_ops::changed(tree_ops::remove_subtree(&list.tasks, task_id));
        adopt(list, next);
        debug!(%task_id, %list_id, "deleted task");
        Ok(self.issue(
            SyncRequest::DeleteTask { task_id },
            Revert::Reinsert {
                list_id,
                location,
                node,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // Reconcile and settle
    // -----------------------------------------------------------------------

    /// Replace the whole forest with authoritative data. Revert records of
    /// requests still in flight are dropped.
    pub fn reconcile(&mut self, lists: Vec<TaskList>) {
        self.lists = lists.into_iter().map(|list| (list.id, list)).collect();
        self.epoch += 1;
        info!(
            lists = self.lists.len(),
            tasks = self.lists.values().map(TaskList::task_count).sum::<usize>(),
            "reconciled"
        );
    }

    /// Apply the backend's answer to `ticket`.
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<SyncReply, SyncError>) -> Settled {
        let Some(flight) = self.in_flight.remove(&ticket) else {
            debug!(%ticket, "settled unknown ticket");
            return Settled::Ignored;
        };
        match outcome {
            Ok(reply) => self.confirm(flight.request, reply),
            Err(error) => {
                warn!(%ticket, kind = flight.request.kind(), %error, "request failed");
                let reverted = self.revert(flight);
                Settled::Failed { error, reverted }
            }
        }
    }

    pub(super) fn issue(&mut self, request: SyncRequest, revert: Revert) -> Pending {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        debug!(%ticket, kind = request.kind(), "issued request");
        self.in_flight.insert(
            ticket,
            InFlight {
                request: request.clone(),
                revert,
                epoch: self.epoch,
            },
        );
        Pending { ticket, request }
    }

    fn confirm(&mut self, request: SyncRequest, reply: SyncReply) -> Settled {
        match (request, reply) {
            (SyncRequest::AddList { .. }, SyncReply::List(header)) => self.insert_created_list(header),
            (SyncRequest::AddTask(body), SyncReply::Task(task)) => {
                self.insert_created_task(&body, task)
            }
            (request, SyncReply::Ok) => {
                debug!(kind = request.kind(), "confirmed");
                Settled::Confirmed
            }
            (request, reply) => {
                warn!(kind = request.kind(), ?reply, "reply does not match request");
                Settled::Confirmed
            }
        }
    }

    fn insert_created_list(&mut self, header: ListHeader) -> Settled {
        let list_id = header.id;
        if self.lists.contains_key(&list_id) {
            debug!(%list_id, "created list already present");
        } else {
            self.lists.insert(list_id, TaskList::new(list_id, header.name));
        }
        Settled::ListCreated(list_id)
    }

    fn insert_created_task(&mut self, body: &AddTaskBody, task: WireTask) -> Settled {
        let task_id = task.id;
        if self.owner_of(task_id).is_some() {
            debug!(%task_id, "created task already present");
            return Settled::TaskCreated(task_id);
        }
        match body.parent_id {
            Some(parent_id) => {
                // The parent may have moved since the request went out
                let owner = self.owner_of(parent_id);
                match owner.and_then(|id| self.lists.get_mut(&id)) {
                    Some(list) => {
                        let node = normalize::task_from_wire(task, list.id);
                        let next =
                            tree_ops::changed(tree_ops::insert_child(&list.tasks, parent_id, node));
                        adopt(list, next);
                    }
                    None => debug!(%task_id, %parent_id, "parent gone, dropping created subtask"),
                }
            }
            None => match body.list_id.and_then(|id| self.lists.get_mut(&id)) {
                Some(list) => {
                    let node = normalize::task_from_wire(task, list.id);
                    list.tasks.push(node);
                }
                None => debug!(%task_id, "list gone, dropping created task"),
            },
        }
        Settled::TaskCreated(task_id)
    }

    fn revert(&mut self, flight: InFlight) -> bool {
        if matches!(flight.revert, Revert::Nothing) {
            return false;
        }
        if flight.epoch != self.epoch {
            warn!(kind = flight.request.kind(), "state reconciled since request, not reverting");
            return false;
        }
        let snapshot_only = self.rollback == RollbackPolicy::MovesOnly;
        match flight.revert {
            Revert::Nothing => false,
            Revert::Move {
                task_id,
                from,
                index,
            } => self.revert_move(task_id, from, index),
            _ if snapshot_only => {
                warn!(
                    kind = flight.request.kind(),
                    "keeping optimistic change until the next refresh"
                );
                false
            }
            Revert::Patch {
                task_id,
                applied,
                previous,
            } => self.revert_patch(task_id, &applied, previous),
            Revert::Reinsert {
                list_id,
                location,
                node,
            } => self.reinsert(list_id, location, node),
            Revert::Rename {
                list_id,
                applied,
                previous,
            } => match self.lists.get_mut(&list_id) {
                Some(list) if list.name == applied => {
                    warn!(%list_id, "reverted rename");
                    list.name = previous;
                    true
                }
                _ => false,
            },
            Revert::RestoreList { index, list } => {
                if self.lists.contains_key(&list.id) {
                    return false;
                }
                warn!(list_id = %list.id, "restored deleted list");
                let index = index.min(self.lists.len());
                self.lists.shift_insert(index, list.id, list);
                true
            }
            Revert::RestoreAll(previous) => {
                let mut restored: IndexMap<ListId, TaskList> = previous
                    .into_iter()
                    .filter(|list| !self.lists.contains_key(&list.id))
                    .map(|list| (list.id, list))
                    .collect();
                if restored.is_empty() {
                    return false;
                }
                warn!(lists = restored.len(), "restored cleared lists");
                restored.extend(std::mem::take(&mut self.lists));
                self.lists = restored;
                true
            }
        }
    }

    /// Undo only the fields that still hold the optimistic value.
    fn revert_patch(&mut self, task_id: TaskId, applied: &TaskPatch, previous: TaskPatch) -> bool {
        let Some(list) = self
            .owner_of(task_id)
            .and_then(|owner| self.lists.get_mut(&owner))
        else {
            return false;
        };
        let Some(node) = tree_ops::find_node(&list.tasks, task_id) else {
            return false;
        };
        let still = applied.still_applied(node);
        let undo = TaskPatch {
            text: still.text.and(previous.text),
            completed: still.completed.and(previous.completed),
            list_id: still.list_id.and(previous.list_id),
        };
        if undo.is_empty() {
            return false;
        }
        warn!(%task_id, ?undo, "reverted task update");
        let next = tree_ops::changed(tree_ops::update_node(&list.tasks, task_id, &undo));
        adopt(list, next)
    }

    /// Put a deleted subtree back where it was, if that spot still exists
    /// and none of its ids came back some other way.
    fn reinsert(&mut self, list_id: ListId, location: NodeLocation, node: TaskNode) -> bool {
        let ids = tree_ops::collect_ids(std::slice::from_ref(&node));
        if ids.iter().any(|id| self.owner_of(*id).is_some()) {
            return false;
        }
        let Some(list) = self.lists.get_mut(&list_id) else {
            return false;
        };
        if let Some(parent_id) = location.parent_id
            && !tree_ops::contains(&list.tasks, parent_id)
        {
            return false;
        }
        warn!(task_id = %node.id, %list_id, "restored deleted task");
        let next = tree_ops::changed(tree_ops::insert_at(
            &list.tasks,
            location.parent_id,
            location.index,
            node,
        ));
        adopt(list, next)
    }

    pub(super) fn locate(&self, task_id: TaskId) -> Option<(ListId, NodeLocation)> {
        self.lists.values().find_map(|list| {
            tree_ops::locate(&list.tasks, task_id).map(|location| (list.id, location))
        })
    }
}

/// Swap in a rebuilt tree. False when the transformation was a no-op.
pub(super) fn adopt(list: &mut TaskList, next: Option<Vec<TaskNode>>) -> bool {
    match next {
        Some(tasks) => {
            list.tasks = tasks;
            true
        }
        None => false,
    }
}

fn non_empty(value: &str, err: ValidationError) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed.to_string())
    }
}

pub(super) fn list_not_found(list_id: ListId) -> StoreError {
    StoreError::NotFound(format!("list {}", list_id))
}

fn task_not_found(task_id: TaskId) -> StoreError {
    StoreError::NotFound(format!("task {}", task_id))
}
