//! Turn server payloads into the nested `TaskNode` shape.
//!
//! The canonical payload is pre-nested. Flat payloads (every task at the
//! top level, hierarchy expressed by `parent_id`) and mixtures of the two
//! are accepted and rebuilt into trees.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::model::list::TaskList;
use crate::model::task::{ListId, TaskId, TaskNode};
use crate::ops::tree_ops;

use super::wire::{FetchResponse, WireList, WireTask};

/// How a list payload expresses its hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    Empty,
    /// Children delivered inside `subtasks`
    Nested,
    /// Children delivered at the top level with `parent_id`
    Flat,
    Mixed,
}

/// Classify a list payload.
pub fn detect_shape(list: &WireList) -> WireShape {
    let tasks = list.tasks.as_deref().unwrap_or_default();
    if tasks.is_empty() {
        return WireShape::Empty;
    }
    let linked = tasks.iter().any(|t| t.parent_id.is_some());
    let nested = tasks
        .iter()
        .any(|t| t.subtasks.as_ref().is_some_and(|s| !s.is_empty()));
    match (nested, linked) {
        (_, false) => WireShape::Nested,
        (false, true) => WireShape::Flat,
        (true, true) => WireShape::Mixed,
    }
}

/// Normalize a full `GET /tasks` payload. Task ids are kept unique across
/// the whole response: a repeated id keeps its first occurrence.
pub fn normalize(response: FetchResponse) -> Vec<TaskList> {
    let mut seen = HashSet::new();
    let mut lists: Vec<TaskList> = Vec::with_capacity(response.lists.len());
    for wire in response.lists {
        if lists.iter().any(|l| l.id == wire.id) {
            warn!(list_id = %wire.id, "duplicate list in payload, keeping the first");
            continue;
        }
        lists.push(normalize_list(wire, &mut seen));
    }
    lists
}

/// Convert a single task reply (e.g. from `POST /add_task`) for `list_id`.
pub fn task_from_wire(wire: WireTask, list_id: ListId) -> TaskNode {
    let mut seen = HashSet::from([wire.id]);
    build_node(wire, list_id, &mut seen)
}

fn normalize_list(wire: WireList, seen: &mut HashSet<TaskId>) -> TaskList {
    let list_id = wire.id;
    let shape = detect_shape(&wire);
    if matches!(shape, WireShape::Flat | WireShape::Mixed) {
        debug!(%list_id, ?shape, "rebuilding hierarchy from parent links");
    }
    let mut entries: Vec<(TaskNode, Option<TaskId>)> = Vec::new();
    for task in wire.tasks.unwrap_or_default() {
        convert(task, list_id, seen, &mut entries);
    }

    // Every id in the list, mapped to the top-level entry that contains it
    let mut root_of: HashMap<TaskId, TaskId> = HashMap::new();
    for (node, _) in &entries {
        for id in tree_ops::collect_ids(std::slice::from_ref(node)) {
            root_of.insert(id, node.id);
        }
    }

    let mut links: HashMap<TaskId, TaskId> = HashMap::new();
    for (node, parent) in &entries {
        match parent {
            Some(parent) if root_of.contains_key(parent) && *parent != node.id => {
                links.insert(node.id, *parent);
            }
            Some(parent) => {
                warn!(task_id = %node.id, parent_id = %parent, list_id = %list_id,
                    "unresolvable parent, keeping task at top level");
            }
            None => {}
        }
    }

    // Break cycles in payload order
    for (node, _) in &entries {
        if leads_back_to(node.id, &links, &root_of) {
            warn!(task_id = %node.id, list_id = %list_id, "parent cycle, keeping task at top level");
            links.remove(&node.id);
        }
    }

    let mut pending: IndexMap<TaskId, Vec<TaskNode>> = IndexMap::new();
    let mut roots = Vec::new();
    for (node, _) in entries {
        match links.get(&node.id) {
            Some(parent) => pending.entry(*parent).or_default().push(node),
            None => roots.push(node),
        }
    }
    for root in &mut roots {
        adopt_children(root, &mut pending);
    }
    roots.extend(pending.into_values().flatten());

    TaskList {
        id: list_id,
        name: wire.name,
        tasks: roots,
    }
}

/// Convert one top-level wire task and its nested subtasks. Ids already
/// seen are dropped along with their subtree.
fn convert(
    wire: WireTask,
    list_id: ListId,
    seen: &mut HashSet<TaskId>,
    out: &mut Vec<(TaskNode, Option<TaskId>)>,
) {
    if !seen.insert(wire.id) {
        warn!(task_id = %wire.id, "duplicate task id in payload, keeping the first");
        return;
    }
    let parent = wire.parent_id;
    out.push((build_node(wire, list_id, seen), parent));
}

fn build_node(wire: WireTask, list_id: ListId, seen: &mut HashSet<TaskId>) -> TaskNode {
    let WireTask {
        id,
        text,
        completed,
        subtasks,
        ..
    } = wire;
    let subtasks = subtasks
        .unwrap_or_default()
        .into_iter()
        .filter_map(|sub| {
            if seen.insert(sub.id) {
                Some(build_node(sub, list_id, seen))
            } else {
                warn!(task_id = %sub.id, "duplicate task id in payload, keeping the first");
                None
            }
        })
        .collect();
    TaskNode {
        id,
        text,
        completed,
        list_id,
        subtasks,
    }
}

/// Does following parent links from `start` come back around to it?
fn leads_back_to(
    start: TaskId,
    links: &HashMap<TaskId, TaskId>,
    root_of: &HashMap<TaskId, TaskId>,
) -> bool {
    let mut current = start;
    for _ in 0..=links.len() {
        let Some(parent) = links.get(&current) else {
            return false;
        };
        let Some(&root) = root_of.get(parent) else {
            return false;
        };
        if root == start {
            return true;
        }
        current = root;
    }
    // Entered a cycle that does not include `start`
    false
}

fn adopt_children(node: &mut TaskNode, pending: &mut IndexMap<TaskId, Vec<TaskNode>>) {
    for sub in &mut node.subtasks {
        adopt_children(sub, pending);
    }
    if let Some(children) = pending.shift_remove(&node.id) {
        for mut child in children {
            adopt_children(&mut child, pending);
            node.subtasks.push(child);
        }
    }
}
