//! Conversation - A tree plus the cursor marking the active tip
//!
//! All mutations go through here so the cursor always names a live node.

use crate::active_path::ActivePath;
use crate::history::{history, History};
use crate::node::{Node, NodeId, Role};
use crate::tree::ConversationTree;

/// Content of the `system` root of a fresh conversation.
pub const ROOT_CONTENT: &str = "Start of Conversation";

/// Result of [`Conversation::delete_subtree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: bool,
    /// Set when the cursor had to move because it was inside the deleted subtree.
    pub new_cursor: Option<NodeId>,
}

impl DeleteOutcome {
    fn refused() -> Self {
        Self {
            deleted: false,
            new_cursor: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    tree: ConversationTree,
    cursor: NodeId,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// A fresh conversation: a lone `system` root with the cursor on it.
    pub fn new() -> Self {
        Self::from_tree(ConversationTree::new(ROOT_CONTENT))
    }

    /// Wrap a loaded tree; the cursor starts at the root.
    pub fn from_tree(tree: ConversationTree) -> Self {
        let cursor = tree.root_id().clone();
        Self { tree, cursor }
    }

    pub fn tree(&self) -> &ConversationTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConversationTree {
        self.tree
    }

    pub fn cursor(&self) -> &NodeId {
        &self.cursor
    }

    pub fn current(&self) -> &Node {
        // The cursor is repaired on every deletion, so it always resolves.
        self.tree
            .find_by_id(&self.cursor)
            .unwrap_or_else(|| self.tree.root())
    }

    /// History from the root to the cursor.
    pub fn history(&self) -> History {
        history(&self.tree, &self.cursor).unwrap_or_else(|| History {
            messages: Vec::new(),
            nodes: Vec::new(),
        })
    }

    pub fn active_path(&self) -> ActivePath {
        ActivePath::from_cursor(&self.tree, &self.cursor)
    }

    /// Start a new user turn under `parent` and move the cursor onto it.
    ///
    /// The reply is produced elsewhere and attached with [`append_reply`].
    /// Returns `None` if `parent` is not in the tree.
    ///
    /// [`append_reply`]: Conversation::append_reply
    pub fn branch(&mut self, parent: &NodeId, prompt: impl Into<String>) -> Option<NodeId> {
        let node = self.fresh_node(Role::User, prompt.into());
        let id = self.tree.add_child(parent, node).ok()?;

        tracing::info!(parent = %parent, node = %id, "Conversation: user turn created");
        self.cursor = id.clone();
        Some(id)
    }

    /// Start a new user turn under the cursor.
    pub fn ask(&mut self, prompt: impl Into<String>) -> NodeId {
        let parent = self.cursor.clone();
        match self.branch(&parent, prompt) {
            Some(id) => id,
            None => unreachable!("cursor always names a node in the tree"),
        }
    }

    /// Attach a model reply under the cursor and advance the cursor to it.
    pub fn append_reply(&mut self, text: impl Into<String>) -> NodeId {
        let parent = self.cursor.clone();
        let node = self.fresh_node(Role::Model, text.into());
        let id = match self.tree.add_child(&parent, node) {
            Ok(id) => id,
            Err(err) => unreachable!("cursor always names a node in the tree: {err}"),
        };

        tracing::info!(parent = %parent, node = %id, "Conversation: model reply appended");
        self.cursor = id.clone();
        id
    }

    /// Short ids can collide; draw again until the id is unused.
    fn fresh_node(&self, role: Role, content: String) -> Node {
        loop {
            let node = Node::new(role, content.clone());
            if !self.tree.contains(node.id()) {
                return node;
            }
        }
    }

    /// The cursor is a user turn without an answer yet.
    pub fn awaiting_reply(&self) -> bool {
        let current = self.current();
        current.role() == Role::User
            && !self
                .tree
                .children_of(current.id())
                .any(|c| c.role() == Role::Model)
    }

    /// Remove a node and everything below it.
    ///
    /// The root and unknown ids are refused. If the cursor was inside the
    /// removed subtree it moves to the removed node's parent.
    pub fn delete_subtree(&mut self, id: &NodeId) -> DeleteOutcome {
        let Some(parent) = self.tree.find_by_id(id).and_then(|n| n.parent().cloned()) else {
            tracing::debug!(node = %id, "Conversation: delete refused (root or unknown)");
            return DeleteOutcome::refused();
        };

        let cursor_inside = self.tree.is_ancestor_or_self(id, &self.cursor);
        if !self.tree.remove_child(&parent, id) {
            return DeleteOutcome::refused();
        }

        let new_cursor = if cursor_inside {
            self.cursor = parent.clone();
            Some(parent)
        } else {
            None
        };

        tracing::info!(
            node = %id,
            cursor = %self.cursor,
            cursor_moved = new_cursor.is_some(),
            "Conversation: subtree deleted"
        );
        DeleteOutcome {
            deleted: true,
            new_cursor,
        }
    }

    /// Move the cursor to `id` if it exists.
    pub fn navigate(&mut self, id: &NodeId) -> bool {
        if !self.tree.contains(id) {
            tracing::debug!(node = %id, "Conversation: navigate target not found");
            return false;
        }
        self.cursor = id.clone();
        true
    }

    /// Move the cursor back to the root, keeping every branch.
    pub fn reset_to_root(&mut self) {
        self.cursor = self.tree.root_id().clone();
    }
}
