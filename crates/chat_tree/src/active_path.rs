//! Active path: the cursor's ancestry, used to pin ancestor questions
//!
//! A user node and its first model child render as one unit, so the
//! active/pinned state of a question is shared with its paired reply.

use std::collections::HashSet;

use crate::node::{Node, NodeId, Role};
use crate::tree::ConversationTree;

/// The ids from the cursor up to the root, inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivePath {
    cursor: NodeId,
    ids: HashSet<NodeId>,
}

impl ActivePath {
    pub fn from_cursor(tree: &ConversationTree, cursor: &NodeId) -> Self {
        let ids = tree.ancestors(cursor).map(|n| n.id().clone()).collect();
        Self {
            cursor: cursor.clone(),
            ids,
        }
    }

    pub fn cursor(&self) -> &NodeId {
        &self.cursor
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The cursor sits on the node, or on the node's paired reply.
    pub fn is_active(&self, tree: &ConversationTree, id: &NodeId) -> bool {
        if &self.cursor == id {
            return true;
        }
        paired_reply(tree, id).is_some_and(|reply| reply.id() == &self.cursor)
    }

    /// The node (or its paired reply) is an ancestor of the cursor but not the
    /// cursor's own unit.
    pub fn is_pinned(&self, tree: &ConversationTree, id: &NodeId) -> bool {
        if self.is_active(tree, id) {
            return false;
        }
        self.contains(id) || paired_reply(tree, id).is_some_and(|reply| self.contains(reply.id()))
    }
}

/// First `model` child of a `user` node.
///
/// Only the first one pairs; further model children are ordinary branches.
pub fn paired_reply<'a>(tree: &'a ConversationTree, id: &NodeId) -> Option<&'a Node> {
    let node = tree.find_by_id(id)?;
    if node.role() != Role::User {
        return None;
    }
    tree.children_of(id).find(|c| c.role() == Role::Model)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        tree: ConversationTree,
        q1: NodeId,
        a1: NodeId,
        q11: NodeId,
        a11: NodeId,
        q2: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = ConversationTree::new("Start");
        let root = tree.root_id().clone();
        let q1 = tree.add_child(&root, Node::new(Role::User, "q1")).unwrap();
        let a1 = tree.add_child(&q1, Node::new(Role::Model, "a1")).unwrap();
        let q11 = tree.add_child(&a1, Node::new(Role::User, "q11")).unwrap();
        let a11 = tree.add_child(&q11, Node::new(Role::Model, "a11")).unwrap();
        let q2 = tree.add_child(&root, Node::new(Role::User, "q2")).unwrap();
        Fixture {
            tree,
            q1,
            a1,
            q11,
            a11,
            q2,
        }
    }

    #[test]
    fn test_path_contains_ancestors_only() {
        let f = fixture();
        let path = ActivePath::from_cursor(&f.tree, &f.a11);
        assert_eq!(path.len(), 5);
        assert!(path.contains(&f.q1));
        assert!(path.contains(f.tree.root_id()));
        assert!(!path.contains(&f.q2));
    }

    #[test]
    fn test_active_unit_is_not_pinned() {
        let f = fixture();
        let path = ActivePath::from_cursor(&f.tree, &f.a11);
        assert!(path.is_active(&f.tree, &f.q11));
        assert!(!path.is_pinned(&f.tree, &f.q11));
        assert!(path.is_pinned(&f.tree, &f.q1));
        assert!(!path.is_pinned(&f.tree, &f.q2));
    }

    #[test]
    fn test_pin_shared_through_paired_reply() {
        let f = fixture();
        // Cursor on the reply's child: the question above is pinned via its reply.
        let path = ActivePath::from_cursor(&f.tree, &f.q11);
        assert!(path.is_pinned(&f.tree, &f.q1));
        assert!(path.is_active(&f.tree, &f.q11));
        assert!(!path.is_active(&f.tree, &f.a1));
    }

    #[test]
    fn test_paired_reply_is_first_model_child() {
        let mut f = fixture();
        let extra = f
            .tree
            .add_child(&f.q1, Node::new(Role::Model, "second answer"))
            .unwrap();
        let reply = paired_reply(&f.tree, &f.q1).unwrap();
        assert_eq!(reply.id(), &f.a1);
        assert_ne!(reply.id(), &extra);
        assert!(paired_reply(&f.tree, &f.a1).is_none());
    }
}
