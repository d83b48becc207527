//! Pure transformations over a sequence of task nodes.
//!
//! Nothing here mutates its input. Mutating operations return a
//! `Cow`: `Borrowed` when the target id does not resolve (the tree is
//! returned unchanged), `Owned` with the rebuilt tree otherwise. Callers
//! swap the owned tree into their state as a single unit.

use std::borrow::Cow;

use crate::model::task::{ListId, TaskId, TaskNode, TaskPatch};

/// Where a node sits in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLocation {
    /// Parent node, or None for a top-level node
    pub parent_id: Option<TaskId>,
    /// Index among its siblings
    pub index: usize,
    /// 0 for top-level nodes
    pub depth: usize,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a node by id at any depth.
pub fn find_node(tree: &[TaskNode], target: TaskId) -> Option<&TaskNode> {
    for node in tree {
        if node.id == target {
            return Some(node);
        }
        if let Some(found) = find_node(&node.subtasks, target) {
            return Some(found);
        }
    }
    None
}

pub fn contains(tree: &[TaskNode], target: TaskId) -> bool {
    find_node(tree, target).is_some()
}

/// Find a node's parent, sibling index and depth.
pub fn locate(tree: &[TaskNode], target: TaskId) -> Option<NodeLocation> {
    locate_in(tree, target, None, 0)
}

fn locate_in(
    tree: &[TaskNode],
    target: TaskId,
    parent_id: Option<TaskId>,
    depth: usize,
) -> Option<NodeLocation> {
    for (index, node) in tree.iter().enumerate() {
        if node.id == target {
            return Some(NodeLocation {
                parent_id,
                index,
                depth,
            });
        }
        if let Some(loc) = locate_in(&node.subtasks, target, Some(node.id), depth + 1) {
            return Some(loc);
        }
    }
    None
}

pub fn depth_of(tree: &[TaskNode], target: TaskId) -> Option<usize> {
    locate(tree, target).map(|loc| loc.depth)
}

/// Visit every node depth-first, pre-order, with its depth.
pub fn for_each_node(tree: &[TaskNode], f: &mut dyn FnMut(&TaskNode, usize)) {
    walk(tree, 0, f);
}

fn walk(tree: &[TaskNode], depth: usize, f: &mut dyn FnMut(&TaskNode, usize)) {
    for node in tree {
        f(node, depth);
        walk(&node.subtasks, depth + 1, f);
    }
}

/// Every id in the tree, pre-order
pub fn collect_ids(tree: &[TaskNode]) -> Vec<TaskId> {
    let mut ids = Vec::new();
    for_each_node(tree, &mut |node, _| ids.push(node.id));
    ids
}

pub fn count_nodes(tree: &[TaskNode]) -> usize {
    tree.iter().map(|n| 1 + count_nodes(&n.subtasks)).sum()
}

// ---------------------------------------------------------------------------
// Transformations
// ---------------------------------------------------------------------------

/// Merge `patch` into the node with id `target`. Absent target: unchanged.
pub fn update_node<'a>(
    tree: &'a [TaskNode],
    target: TaskId,
    patch: &TaskPatch,
) -> Cow<'a, [TaskNode]> {
    to_cow(tree, update_in(tree, target, patch))
}

fn update_in(tree: &[TaskNode], target: TaskId, patch: &TaskPatch) -> Option<Vec<TaskNode>> {
    replace_first(tree, |node| {
        if node.id == target {
            let mut updated = node.clone();
            patch.apply_to(&mut updated);
            Some(updated)
        } else {
            update_in(&node.subtasks, target, patch).map(|subs| node.with_subtasks(subs))
        }
    })
}

/// Append `child` to the subtasks of `parent`. Absent parent: unchanged.
pub fn insert_child(tree: &[TaskNode], parent: TaskId, child: TaskNode) -> Cow<'_, [TaskNode]> {
    insert_at(tree, Some(parent), usize::MAX, child)
}

/// Insert `child` at `index` (clamped) among the children of `parent`, or at
/// the top level when `parent` is None. Absent parent: unchanged.
pub fn insert_at(
    tree: &[TaskNode],
    parent: Option<TaskId>,
    index: usize,
    child: TaskNode,
) -> Cow<'_, [TaskNode]> {
    match parent {
        None => {
            let mut out = tree.to_vec();
            out.insert(index.min(out.len()), child);
            Cow::Owned(out)
        }
        Some(parent) => to_cow(tree, insert_in(tree, parent, index, &child)),
    }
}

fn insert_in(
    tree: &[TaskNode],
    parent: TaskId,
    index: usize,
    child: &TaskNode,
) -> Option<Vec<TaskNode>> {
    replace_first(tree, |node| {
        if node.id == parent {
            let mut updated = node.clone();
            let at = index.min(updated.subtasks.len());
            updated.subtasks.insert(at, child.clone());
            Some(updated)
        } else {
            insert_in(&node.subtasks, parent, index, child).map(|subs| node.with_subtasks(subs))
        }
    })
}

/// Remove every node with id `target`, at any depth, together with its
/// subtree. Absent target: unchanged.
pub fn remove_subtree(tree: &[TaskNode], target: TaskId) -> Cow<'_, [TaskNode]> {
    to_cow(tree, remove_in(tree, target))
}

fn remove_in(tree: &[TaskNode], target: TaskId) -> Option<Vec<TaskNode>> {
    // Built lazily: stays None until the first change is seen.
    let mut out: Option<Vec<TaskNode>> = None;
    for (i, node) in tree.iter().enumerate() {
        let kept = if node.id == target {
            None
        } else {
            match remove_in(&node.subtasks, target) {
                Some(subs) => Some(node.with_subtasks(subs)),
                None => {
                    if let Some(out) = out.as_mut() {
                        out.push(node.clone());
                    }
                    continue;
                }
            }
        };
        let out = out.get_or_insert_with(|| tree[..i].to_vec());
        out.extend(kept);
    }
    out
}

/// Stamp `list_id` onto a node and its whole subtree.
pub fn relist(node: &mut TaskNode, list_id: ListId) {
    node.list_id = list_id;
    for sub in &mut node.subtasks {
        relist(sub, list_id);
    }
}

/// Turn a transformation result into an owned tree, or None if nothing changed.
pub fn changed(result: Cow<'_, [TaskNode]>) -> Option<Vec<TaskNode>> {
    match result {
        Cow::Owned(tree) => Some(tree),
        Cow::Borrowed(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_cow(tree: &[TaskNode], rebuilt: Option<Vec<TaskNode>>) -> Cow<'_, [TaskNode]> {
    match rebuilt {
        Some(tree) => Cow::Owned(tree),
        None => Cow::Borrowed(tree),
    }
}

/// Rebuild `tree` with the first node for which `f` yields a replacement
/// swapped out. None if `f` never yields.
fn replace_first(
    tree: &[TaskNode],
    mut f: impl FnMut(&TaskNode) -> Option<TaskNode>,
) -> Option<Vec<TaskNode>> {
    let (index, replacement) = tree
        .iter()
        .enumerate()
        .find_map(|(i, node)| f(node).map(|r| (i, r)))?;
    let mut out = tree.to_vec();
    out[index] = replacement;
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: u64, text: &str, subtasks: Vec<TaskNode>) -> TaskNode {
        TaskNode {
            id: TaskId(id),
            text: text.to_string(),
            completed: false,
            list_id: ListId(1),
            subtasks,
        }
    }

    /// 1
    /// ├── 2
    /// │   └── 3
    /// │       └── 4
    /// └── 5
    /// 6
    fn sample_tree() -> Vec<TaskNode> {
        vec![
            node(
                1,
                "Ship release",
                vec![
                    node(
                        2,
                        "Write notes",
                        vec![node(3, "Collect PRs", vec![node(4, "Ask team", vec![])])],
                    ),
                    node(5, "Tag build", vec![]),
                ],
            ),
            node(6, "Book venue", vec![]),
        ]
    }

    // --- lookup ---

    #[test]
    fn test_find_node_any_depth() {
        let tree = sample_tree();
        assert_eq!(find_node(&tree, TaskId(1)).unwrap().text, "Ship release");
        assert_eq!(find_node(&tree, TaskId(4)).unwrap().text, "Ask team");
        assert_eq!(find_node(&tree, TaskId(6)).unwrap().text, "Book venue");
        assert!(find_node(&tree, TaskId(99)).is_none());
    }

    #[test]
    fn test_locate_reports_parent_index_depth() {
        let tree = sample_tree();
        assert_eq!(
            locate(&tree, TaskId(6)),
            Some(NodeLocation {
                parent_id: None,
                index: 1,
                depth: 0
            })
        );
        assert_eq!(
            locate(&tree, TaskId(5)),
            Some(NodeLocation {
                parent_id: Some(TaskId(1)),
                index: 1,
                depth: 1
            })
        );
        assert_eq!(depth_of(&tree, TaskId(4)), Some(3));
        assert_eq!(depth_of(&tree, TaskId(42)), None);
    }

    #[test]
    fn test_collect_and_count() {
        let tree = sample_tree();
        let ids: Vec<u64> = collect_ids(&tree).into_iter().map(|id| id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(count_nodes(&tree), 6);
    }

    // --- update ---

    #[test]
    fn test_update_node_deep() {
        let tree = sample_tree();
        let updated = update_node(&tree, TaskId(4), &TaskPatch::completed(true));
        let found = find_node(&updated, TaskId(4)).unwrap();
        assert!(found.completed);
        assert_eq!(found.text, "Ask team");
        // Ancestors untouched
        assert!(!find_node(&updated, TaskId(3)).unwrap().completed);
        assert!(!find_node(&updated, TaskId(1)).unwrap().completed);
        // Input untouched
        assert!(!find_node(&tree, TaskId(4)).unwrap().completed);
    }

    #[test]
    fn test_update_node_does_not_cascade() {
        let tree = sample_tree();
        let updated = update_node(&tree, TaskId(1), &TaskPatch::completed(true));
        assert!(find_node(&updated, TaskId(1)).unwrap().completed);
        assert!(!find_node(&updated, TaskId(2)).unwrap().completed);
        assert!(!find_node(&updated, TaskId(5)).unwrap().completed);
    }

    #[test]
    fn test_update_node_text_only() {
        let tree = sample_tree();
        let updated = update_node(&tree, TaskId(5), &TaskPatch::text("Tag v1.0"));
        let found = find_node(&updated, TaskId(5)).unwrap();
        assert_eq!(found.text, "Tag v1.0");
        assert!(!found.completed);
        assert_eq!(count_nodes(&updated), 6);
    }

    // --- insert ---

    #[test]
    fn test_insert_child_appends_at_end() {
        let tree = sample_tree();
        let inserted = insert_child(&tree, TaskId(1), node(7, "Announce", vec![]));
        let parent = find_node(&inserted, TaskId(1)).unwrap();
        let child_ids: Vec<u64> = parent.subtasks.iter().map(|n| n.id.0).collect();
        assert_eq!(child_ids, vec![2, 5, 7]);
    }

    #[test]
    fn test_insert_child_into_leaf() {
        let tree = sample_tree();
        let inserted = insert_child(&tree, TaskId(6), node(7, "Call caterer", vec![]));
        assert_eq!(depth_of(&inserted, TaskId(7)), Some(1));
        assert_eq!(find_node(&inserted, TaskId(6)).unwrap().subtasks.len(), 1);
    }

    #[test]
    fn test_insert_at_clamps_index() {
        let tree = sample_tree();
        let top = insert_at(&tree, None, 0, node(7, "First", vec![]));
        assert_eq!(top[0].id, TaskId(7));

        let nested = insert_at(&tree, Some(TaskId(1)), 1, node(8, "Middle", vec![]));
        let parent = find_node(&nested, TaskId(1)).unwrap();
        let child_ids: Vec<u64> = parent.subtasks.iter().map(|n| n.id.0).collect();
        assert_eq!(child_ids, vec![2, 8, 5]);

        let end = insert_at(&tree, None, 100, node(9, "Last", vec![]));
        assert_eq!(end.last().unwrap().id, TaskId(9));
    }

    // --- remove ---

    #[test]
    fn test_remove_subtree_removes_descendants() {
        let tree = sample_tree();
        let removed = remove_subtree(&tree, TaskId(2));
        for id in [2, 3, 4] {
            assert!(find_node(&removed, TaskId(id)).is_none(), "{} survived", id);
        }
        assert!(contains(&removed, TaskId(1)));
        assert!(contains(&removed, TaskId(5)));
        assert!(contains(&removed, TaskId(6)));
    }

    #[test]
    fn test_remove_subtree_top_level() {
        let tree = sample_tree();
        let removed = remove_subtree(&tree, TaskId(1));
        assert_eq!(collect_ids(&removed), vec![TaskId(6)]);
    }

    #[test]
    fn test_remove_subtree_every_node() {
        let tree = sample_tree();
        for id in collect_ids(&tree) {
            let removed = remove_subtree(&tree, id);
            assert!(find_node(&removed, id).is_none());
            let descendants = collect_ids(&find_node(&tree, id).unwrap().subtasks);
            for d in descendants {
                assert!(find_node(&removed, d).is_none());
            }
        }
    }

    #[test]
    fn test_remove_subtree_scans_duplicates() {
        // Not a well-formed tree, but removal must still be total.
        let tree = vec![
            node(1, "a", vec![node(9, "dup", vec![])]),
            node(9, "dup", vec![]),
        ];
        let removed = remove_subtree(&tree, TaskId(9));
        assert!(!contains(&removed, TaskId(9)));
        assert_eq!(collect_ids(&removed), vec![TaskId(1)]);
    }

    // --- absent targets ---

    #[test]
    fn test_absent_targets_are_noops() {
        let tree = sample_tree();
        let absent = TaskId(404);

        let updated = update_node(&tree, absent, &TaskPatch::completed(true));
        assert!(matches!(updated, Cow::Borrowed(_)));
        assert_eq!(&*updated, &tree[..]);

        let removed = remove_subtree(&tree, absent);
        assert!(matches!(removed, Cow::Borrowed(_)));
        assert_eq!(&*removed, &tree[..]);

        let inserted = insert_child(&tree, absent, node(7, "orphan", vec![]));
        assert!(matches!(inserted, Cow::Borrowed(_)));
        assert_eq!(&*inserted, &tree[..]);
    }

    #[test]
    fn test_changed_helper() {
        let tree = sample_tree();
        assert!(changed(remove_subtree(&tree, TaskId(404))).is_none());
        let next = changed(remove_subtree(&tree, TaskId(6))).unwrap();
        assert_eq!(next.len(), 1);
    }

    // --- relist ---

    #[test]
    fn test_relist_stamps_subtree() {
        let mut root = sample_tree().remove(0);
        relist(&mut root, ListId(2));
        for_each_node(std::slice::from_ref(&root), &mut |n, _| {
            assert_eq!(n.list_id, ListId(2));
        });
    }
}
