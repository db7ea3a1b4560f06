//! Tree materialization and lineage maintenance.
//!
//! Only `parent` is authoritative. The tree is rebuilt from a flat list on
//! every request through an id→index arena, so no node ever holds a live
//! reference to another.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Category, CategoryTreeNode};

/// Build a forest from categories already sorted by `(level, name)`.
///
/// Sibling order follows input order. A category whose parent is not in
/// `categories` (for example an inactive ancestor that was filtered out)
/// becomes a root. Nodes caught in a corrupt parent cycle are emitted as
/// roots instead of being dropped.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryTreeNode> {
    let index: HashMap<Uuid, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); categories.len()];
    let mut roots = Vec::new();

    for (i, category) in categories.iter().enumerate() {
        match category
            .parent
            .and_then(|parent| index.get(&parent).copied())
        {
            Some(parent_idx) if parent_idx != i => children[parent_idx].push(i),
            _ => roots.push(i),
        }
    }

    let mut slots: Vec<Option<CategoryTreeNode>> = categories
        .into_iter()
        .map(|c| Some(CategoryTreeNode::from(c)))
        .collect();

    let mut forest: Vec<CategoryTreeNode> = roots
        .into_iter()
        .filter_map(|root| assemble(root, &children, &mut slots))
        .collect();

    for i in 0..slots.len() {
        if let Some(node) = assemble(i, &children, &mut slots) {
            forest.push(node);
        }
    }

    forest
}

fn assemble(
    idx: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<CategoryTreeNode>],
) -> Option<CategoryTreeNode> {
    let mut node = slots[idx].take()?;
    node.children = children[idx]
        .iter()
        .filter_map(|&child| assemble(child, children, slots))
        .collect();
    Some(node)
}

/// New `(id, ancestors, level)` for every descendant of `moved_id` after the
/// moved node's own ancestor path became `new_path`.
///
/// Each descendant keeps the part of its path from `moved_id` downwards and
/// gets `new_path` in front of it. Descendants whose stored lineage already
/// matches are left out, so rerunning after a partial rebase only returns
/// the documents still to fix.
pub fn rebase_descendants(
    moved_id: Uuid,
    new_path: &[Uuid],
    descendants: &[Category],
) -> Vec<(Uuid, Vec<Uuid>, u32)> {
    descendants
        .iter()
        .filter_map(|descendant| {
            let pos = descendant.ancestors.iter().position(|id| *id == moved_id)?;
            let mut ancestors = new_path.to_vec();
            ancestors.extend_from_slice(&descendant.ancestors[pos..]);
            let level = ancestors.len() as u32;
            if ancestors == descendant.ancestors && level == descendant.level {
                return None;
            }
            Some((descendant.id, ancestors, level))
        })
        .collect()
}
