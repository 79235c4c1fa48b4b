//! The in-memory selection tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Ids are handed out in
//! pre-order during a build and never reused until the next build, so ordering
//! ids is the same as ordering nodes by tree traversal.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::CoreError;
use super::exclusions::ExclusionSet;
use super::ignore::IgnoreRules;
use super::walk::visible_entries;

/// Handle to a node of the current build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub path: PathBuf,
    pub is_directory: bool,
    pub children: Vec<NodeId>,
    pub checked: bool,
    /// Expanded in a tree view. Only the root starts open.
    pub open: bool,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A state change a rendering layer may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Rebuilt { root: PathBuf, node_count: usize },
    Checked { nodes: Vec<NodeId>, checked: bool },
    Removed { node: NodeId, path: PathBuf },
    Highlighted { previous: Option<NodeId>, current: NodeId },
    Cleared { unchecked: Vec<NodeId> },
}

#[derive(Debug, Default)]
pub struct TreeModel {
    root_path: PathBuf,
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
    by_path: HashMap<PathBuf, NodeId>,
    checked: BTreeSet<NodeId>,
    highlighted: Option<NodeId>,
    changes: Vec<TreeChange>,
}

impl TreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole tree with a fresh build of `root`.
    ///
    /// All checked state and the highlight are reset. The root is always present,
    /// even when it is itself excluded.
    pub fn build(
        &mut self,
        root: &Path,
        exclusions: &ExclusionSet,
        rules: &IgnoreRules,
    ) -> Result<(), CoreError> {
        let root_path =
            fs::canonicalize(root).map_err(|_| CoreError::RootNotFound(root.to_path_buf()))?;

        let mut nodes: Vec<Option<Node>> = Vec::new();
        let mut by_path = HashMap::new();
        // Open directories on the current descent, indexed by depth.
        let mut ancestors: Vec<NodeId> = Vec::new();

        for entry in visible_entries(&root_path, exclusions, rules) {
            let depth = entry.depth();
            ancestors.truncate(depth);
            let parent = ancestors.last().copied();
            let id = NodeId(nodes.len());
            let is_directory = entry.file_type().is_dir();
            let path = entry.into_path();

            if let Some(Some(parent_node)) = parent.map(|p| &mut nodes[p.0]) {
                parent_node.children.push(id);
            }
            by_path.insert(path.clone(), id);
            nodes.push(Some(Node {
                path,
                is_directory,
                children: Vec::new(),
                checked: false,
                open: depth == 0,
                parent,
            }));

            if is_directory {
                ancestors.push(id);
            }
        }

        self.root = if nodes.is_empty() { None } else { Some(NodeId(0)) };
        self.nodes = nodes;
        self.by_path = by_path;
        self.checked.clear();
        self.highlighted = None;
        self.root_path = root_path;
        self.changes.push(TreeChange::Rebuilt {
            root: self.root_path.clone(),
            node_count: self.by_path.len(),
        });

        tracing::info!(
            "Tree built for {:?}: {} node(s)",
            self.root_path,
            self.by_path.len()
        );
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlighted
    }

    /// Looks a path up as given, then by its canonical form.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied().or_else(|| {
            fs::canonicalize(path)
                .ok()
                .and_then(|canonical| self.by_path.get(&canonical).copied())
        })
    }

    /// Flips the node (or forces it to `explicit`) and writes the same value to
    /// every node currently in its subtree. Returns the new value.
    pub fn toggle(&mut self, id: NodeId, explicit: Option<bool>) -> Result<bool, CoreError> {
        let current = self.node(id).ok_or(CoreError::UnknownNode(id))?.checked;
        let new_state = explicit.unwrap_or(!current);

        let subtree = self.subtree(id);
        for &node_id in &subtree {
            self.set_checked(node_id, new_state);
        }
        self.changes.push(TreeChange::Checked {
            nodes: subtree,
            checked: new_state,
        });
        Ok(new_state)
    }

    /// Detaches a node and its whole subtree without rebuilding.
    ///
    /// The exclusion registry is left alone; callers that exclude a node update
    /// it themselves.
    pub fn remove_node(&mut self, id: NodeId) -> Result<PathBuf, CoreError> {
        let (path, parent) = {
            let node = self.node(id).ok_or(CoreError::UnknownNode(id))?;
            (node.path.clone(), node.parent)
        };

        for node_id in self.subtree(id) {
            if let Some(node) = self.nodes[node_id.0].take() {
                self.by_path.remove(&node.path);
            }
            self.checked.remove(&node_id);
            if self.highlighted == Some(node_id) {
                self.highlighted = None;
            }
        }

        match parent {
            Some(parent_id) => {
                if let Some(Some(parent_node)) = self.nodes.get_mut(parent_id.0) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            None => self.root = None,
        }

        tracing::debug!("Removed {:?} from the tree", path);
        self.changes.push(TreeChange::Removed {
            node: id,
            path: path.clone(),
        });
        Ok(path)
    }

    /// Checked paths in traversal order, minus any path whose ancestor directory
    /// is also checked.
    pub fn get_selected(&self) -> Vec<PathBuf> {
        self.checked
            .iter()
            .filter(|&&id| !self.has_checked_ancestor(id))
            .filter_map(|&id| self.node(id).map(|node| node.path.clone()))
            .collect()
    }

    /// Highlights the node at `path`, opening all of its ancestors.
    ///
    /// Returns `false` (and leaves the current highlight alone) when the path is
    /// not part of the live tree.
    pub fn navigate(&mut self, path: &Path) -> bool {
        let Some(id) = self.find(path) else {
            tracing::debug!("Navigation target not in tree: {:?}", path);
            return false;
        };

        let previous = self.highlighted.take();

        let mut current = self.node(id).and_then(|node| node.parent);
        while let Some(ancestor) = current {
            match self.nodes.get_mut(ancestor.0) {
                Some(Some(node)) => {
                    node.open = true;
                    current = node.parent;
                }
                _ => break,
            }
        }

        self.highlighted = Some(id);
        self.changes.push(TreeChange::Highlighted {
            previous,
            current: id,
        });
        true
    }

    /// Unchecks every checked node and drops the highlight.
    pub fn clear_selection(&mut self) {
        let unchecked: Vec<NodeId> = std::mem::take(&mut self.checked).into_iter().collect();
        for id in &unchecked {
            if let Some(Some(node)) = self.nodes.get_mut(id.0) {
                node.checked = false;
            }
        }
        self.highlighted = None;
        self.changes.push(TreeChange::Cleared { unchecked });
    }

    pub fn set_open(&mut self, id: NodeId, open: bool) -> Result<(), CoreError> {
        match self.nodes.get_mut(id.0) {
            Some(Some(node)) if node.is_directory => {
                node.open = open;
                Ok(())
            }
            Some(Some(_)) => Ok(()),
            _ => Err(CoreError::UnknownNode(id)),
        }
    }

    /// Expands or collapses every directory. The root always stays open.
    pub fn set_all_open(&mut self, open: bool) {
        let root = self.root;
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            if let Some(node) = slot {
                if node.is_directory {
                    node.open = open || root == Some(NodeId(index));
                }
            }
        }
    }

    /// Live nodes in pre-order with their depth (root = 0).
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 0)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            out.push((id, depth));
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Drains the change notifications recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<TreeChange> {
        std::mem::take(&mut self.changes)
    }

    /// `id` followed by all of its descendants, pre-order.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else { continue };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(Some(node)) = self.nodes.get_mut(id.0) {
            node.checked = checked;
            if checked {
                self.checked.insert(id);
            } else {
                self.checked.remove(&id);
            }
        }
    }

    fn has_checked_ancestor(&self, id: NodeId) -> bool {
        let mut current = self.node(id).and_then(|node| node.parent);
        while let Some(ancestor) = current {
            if self.checked.contains(&ancestor) {
                return true;
            }
            current = self.node(ancestor).and_then(|node| node.parent);
        }
        false
    }
}
