//! ConversationTree - Arena that owns every node of one conversation
//!
//! Ownership flows top-down: the arena holds the nodes, each node lists its
//! children by id, and the parent link is a plain id lookup. The arena only
//! ever contains nodes reachable from the root; removing a child purges its
//! whole subtree.

use std::collections::HashMap;

use crate::error::{Result, TreeError};
use crate::node::{Node, NodeId, Role};

/// A rooted conversation tree whose root is always a `system` node.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationTree {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl ConversationTree {
    /// Create a tree holding only a `system` root with the given content.
    pub fn new(root_content: impl Into<String>) -> Self {
        Self::from_root(Node::new(Role::System, root_content))
    }

    /// Build a tree around an existing detached node. The caller guarantees the
    /// node is a childless `system` node.
    pub(crate) fn from_root(mut root: Node) -> Self {
        root.parent = None;
        root.children.clear();
        let id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(id.clone(), root);
        Self { root: id, nodes }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look a node up by id.
    pub fn find_by_id(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Append `node` as the last child of `parent` and return its id.
    ///
    /// The node must be detached and childless; its parent link is set here.
    pub fn add_child(&mut self, parent: &NodeId, mut node: Node) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(TreeError::NotFound(parent.clone()));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(TreeError::DuplicateId(node.id.clone()));
        }
        if !node.children.is_empty() {
            return Err(TreeError::InvalidOperation(format!(
                "node `{}` must be attached before its children",
                node.id
            )));
        }

        let id = node.id.clone();
        node.parent = Some(parent.clone());
        self.nodes.insert(id.clone(), node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id.clone());
        }

        tracing::debug!(parent = %parent, node = %id, "ConversationTree: child added");
        Ok(id)
    }

    /// Detach `child` from `parent` and drop it together with its descendants.
    ///
    /// Returns `false` when `child` is not one of `parent`'s children.
    pub fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> bool {
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return false;
        };
        let Some(pos) = parent_node.children.iter().position(|c| c == child) else {
            return false;
        };
        parent_node.children.remove(pos);

        let mut stack = vec![child.clone()];
        let mut removed = 0usize;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
                removed += 1;
            }
        }

        tracing::debug!(
            parent = %parent,
            node = %child,
            removed,
            "ConversationTree: subtree removed"
        );
        true
    }

    /// Walk from `id` up to the root, starting with the node itself.
    pub fn ancestors(&self, id: &NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.nodes.get(id),
        }
    }

    /// Number of edges between the node and the root.
    pub fn depth(&self, id: &NodeId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        Some(self.ancestors(id).count() - 1)
    }

    /// True if `ancestor` lies on the path from `node` to the root (inclusive).
    pub fn is_ancestor_or_self(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        self.ancestors(node).any(|n| &n.id == ancestor)
    }

    /// Children of `id` as nodes, in insertion order.
    pub fn children_of<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |c| self.nodes.get(c))
    }

    /// Pre-order traversal from the root, children visited in order.
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![&self.root],
        }
    }

    /// First `user` node in depth-first order.
    pub fn first_user_node(&self) -> Option<&Node> {
        self.iter_depth_first().find(|n| n.role == Role::User)
    }
}

/// Iterator over a node and its ancestors, ending at the root.
pub struct Ancestors<'a> {
    tree: &'a ConversationTree,
    next: Option<&'a Node>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .parent
            .as_ref()
            .and_then(|p| self.tree.nodes.get(p));
        Some(current)
    }
}

/// Pre-order iterator over the whole tree.
pub struct DepthFirst<'a> {
    tree: &'a ConversationTree,
    stack: Vec<&'a NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.nodes.get(id)?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
