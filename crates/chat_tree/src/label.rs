//! Question labels: hierarchical numbering of user turns
//!
//! A user node's label is its 1-based position among the user-role children of
//! its parent, prefixed by the label of the nearest user ancestor:
//! `1`, `1.1`, `1.2`, `2`, `2.1`, ... Labels are derived from structure on
//! every call and never stored, so deletions renumber automatically.

use crate::node::{Node, NodeId, Role};
use crate::tree::ConversationTree;

/// Label for a user node; `None` for other roles or unknown ids.
pub fn question_label(tree: &ConversationTree, id: &NodeId) -> Option<String> {
    let node = tree.find_by_id(id)?;
    if node.role() != Role::User {
        return None;
    }

    let mut indices = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        indices.push(sibling_index(tree, n));
        current = nearest_user_ancestor(tree, n);
    }

    let label = indices
        .iter()
        .rev()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(".");
    Some(label)
}

/// 1-based position among the parent's user-role children.
fn sibling_index(tree: &ConversationTree, node: &Node) -> usize {
    node.parent()
        .and_then(|parent| {
            tree.children_of(parent)
                .filter(|c| c.role() == Role::User)
                .position(|c| c.id() == node.id())
        })
        .map_or(1, |i| i + 1)
}

fn nearest_user_ancestor<'a>(tree: &'a ConversationTree, node: &Node) -> Option<&'a Node> {
    tree.ancestors(node.id())
        .skip(1)
        .find(|n| n.role() == Role::User)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(tree: &ConversationTree, id: &NodeId) -> String {
        question_label(tree, id).unwrap()
    }

    #[test]
    fn test_root_level_questions_are_numbered() {
        let mut tree = ConversationTree::new("Start");
        let root = tree.root_id().clone();
        let q1 = tree.add_child(&root, Node::new(Role::User, "a")).unwrap();
        let q2 = tree.add_child(&root, Node::new(Role::User, "b")).unwrap();
        assert_eq!(label(&tree, &q1), "1");
        assert_eq!(label(&tree, &q2), "2");
    }

    #[test]
    fn test_nested_labels_skip_model_turns() {
        let mut tree = ConversationTree::new("Start");
        let root = tree.root_id().clone();
        let q1 = tree.add_child(&root, Node::new(Role::User, "a")).unwrap();
        let a1 = tree.add_child(&q1, Node::new(Role::Model, "A")).unwrap();
        let q11 = tree.add_child(&a1, Node::new(Role::User, "b")).unwrap();
        let q12 = tree.add_child(&a1, Node::new(Role::User, "c")).unwrap();
        let a12 = tree.add_child(&q12, Node::new(Role::Model, "C")).unwrap();
        let q121 = tree.add_child(&a12, Node::new(Role::User, "d")).unwrap();

        assert_eq!(label(&tree, &q11), "1.1");
        assert_eq!(label(&tree, &q12), "1.2");
        assert_eq!(label(&tree, &q121), "1.2.1");
        assert!(question_label(&tree, &a1).is_none());
        assert!(question_label(&tree, &root).is_none());
    }

    #[test]
    fn test_model_siblings_do_not_count() {
        let mut tree = ConversationTree::new("Start");
        let root = tree.root_id().clone();
        tree.add_child(&root, Node::new(Role::Model, "stray")).unwrap();
        let q = tree.add_child(&root, Node::new(Role::User, "a")).unwrap();
        assert_eq!(label(&tree, &q), "1");
    }

    #[test]
    fn test_labels_renumber_after_deletion() {
        let mut tree = ConversationTree::new("Start");
        let root = tree.root_id().clone();
        let q1 = tree.add_child(&root, Node::new(Role::User, "a")).unwrap();
        let q2 = tree.add_child(&root, Node::new(Role::User, "b")).unwrap();
        assert_eq!(label(&tree, &q2), "2");

        assert!(tree.remove_child(&root, &q1));
        assert_eq!(label(&tree, &q2), "1");
    }
}
