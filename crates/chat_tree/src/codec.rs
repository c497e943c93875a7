//! Tree codec: persistence-neutral records
//!
//! In memory a [`NodeRecord`] nests its children. Serialized, the same record
//! is a flat list in depth-first order where every entry names its parent, so
//! JSON nesting stays constant however deep the conversation grows:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "3f2a9c1e", "role": "system", "content": "Start of Conversation", "timestamp": "2024-05-01T10:00:00Z" },
//!     { "id": "9b1d04aa", "parent": "3f2a9c1e", "role": "user", "content": "Explain gravity", "timestamp": "2024-05-01T10:00:05Z" }
//!   ]
//! }
//! ```
//!
//! All walks here use explicit stacks, never recursion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::node::{Node, NodeId, Role};
use crate::tree::ConversationTree;

/// One node and, nested, its subtree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(into = "FlatTree", try_from = "FlatTree")]
pub struct NodeRecord {
    pub id: NodeId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub children: Vec<NodeRecord>,
}

/// Wire form of a [`NodeRecord`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FlatTree {
    /// Parents always precede their children; siblings keep their order.
    pub nodes: Vec<FlatNode>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FlatNode {
    pub id: NodeId,
    /// `None` only for the first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub role: Role,
    pub content: String,
    /// Missing in hand-written files; the load time stands in.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl From<NodeRecord> for FlatTree {
    fn from(root: NodeRecord) -> Self {
        let mut nodes = Vec::new();
        let mut stack = vec![(None, root)];
        while let Some((parent, record)) = stack.pop() {
            let NodeRecord {
                id,
                role,
                content,
                timestamp,
                children,
            } = record;
            stack.extend(children.into_iter().rev().map(|c| (Some(id.clone()), c)));
            nodes.push(FlatNode {
                id,
                parent,
                role,
                content,
                timestamp,
            });
        }
        Self { nodes }
    }
}

impl TryFrom<FlatTree> for NodeRecord {
    type Error = CodecError;

    fn try_from(flat: FlatTree) -> Result<Self, CodecError> {
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(flat.nodes.len());
        let mut parents = Vec::with_capacity(flat.nodes.len());
        let mut records = Vec::with_capacity(flat.nodes.len());

        for node in flat.nodes {
            let parent = match &node.parent {
                None if records.is_empty() => None,
                None => return Err(CodecError::ExtraRoot(node.id)),
                Some(parent) => match index.get(parent) {
                    Some(&i) => Some(i),
                    None => {
                        return Err(CodecError::UnknownParent {
                            id: node.id.clone(),
                            parent: parent.clone(),
                        })
                    }
                },
            };
            if index.insert(node.id.clone(), records.len()).is_some() {
                return Err(CodecError::DuplicateId(node.id));
            }
            parents.push(parent);
            records.push(NodeRecord {
                id: node.id,
                role: node.role,
                content: node.content,
                timestamp: node.timestamp,
                children: Vec::new(),
            });
        }

        nest(records, &parents).ok_or(CodecError::EmptyRecord)
    }
}

/// Fold childless records into one nested record. `parents[i]` is the index
/// of record `i`'s parent and is always smaller than `i`; record 0 is the root.
fn nest(mut records: Vec<NodeRecord>, parents: &[Option<usize>]) -> Option<NodeRecord> {
    // Popping from the back finishes every child before its parent.
    while records.len() > 1 {
        let i = records.len() - 1;
        let mut record = records.pop()?;
        record.children.reverse();
        records[parents[i]?].children.push(record);
    }
    let mut root = records.pop()?;
    root.children.reverse();
    Some(root)
}

fn leaf_record(node: &Node) -> NodeRecord {
    NodeRecord {
        id: node.id().clone(),
        role: node.role(),
        content: node.content().to_string(),
        timestamp: node.created_at(),
        children: Vec::new(),
    }
}

/// Encode the whole tree, depth-first, children in order.
pub fn encode(tree: &ConversationTree) -> NodeRecord {
    let mut index: HashMap<&NodeId, usize> = HashMap::with_capacity(tree.len());
    let mut parents = Vec::with_capacity(tree.len());
    let mut records = Vec::with_capacity(tree.len());

    for node in tree.iter_depth_first() {
        parents.push(node.parent().and_then(|p| index.get(p).copied()));
        index.insert(node.id(), records.len());
        records.push(leaf_record(node));
    }

    match nest(records, &parents) {
        Some(record) => record,
        None => unreachable!("depth-first traversal always yields the root first"),
    }
}

/// Rebuild a tree from a record, keeping ids and timestamps.
///
/// Fails on the first structural problem; no partial tree is returned.
pub fn decode(record: &NodeRecord) -> Result<ConversationTree, CodecError> {
    if record.id.is_empty() {
        return Err(CodecError::EmptyId { depth: 0 });
    }
    if record.role != Role::System {
        return Err(CodecError::RootNotSystem {
            id: record.id.clone(),
            role: record.role.to_string(),
        });
    }

    let mut tree = ConversationTree::from_root(Node::with_id(
        record.id.clone(),
        record.role,
        record.content.clone(),
        record.timestamp,
    ));

    let mut stack: Vec<(&NodeId, &NodeRecord, usize)> = record
        .children
        .iter()
        .rev()
        .map(|c| (&record.id, c, 1))
        .collect();
    while let Some((parent, child, depth)) = stack.pop() {
        if child.id.is_empty() {
            return Err(CodecError::EmptyId { depth });
        }
        if tree.contains(&child.id) {
            return Err(CodecError::DuplicateId(child.id.clone()));
        }

        let node = Node::with_id(
            child.id.clone(),
            child.role,
            child.content.clone(),
            child.timestamp,
        );
        tree.add_child(parent, node)
            .map_err(|_| CodecError::DuplicateId(child.id.clone()))?;

        stack.extend(child.children.iter().rev().map(|c| (&child.id, c, depth + 1)));
    }

    tracing::debug!(root = %record.id, nodes = tree.len(), "codec: tree decoded");
    Ok(tree)
}

/// Encode straight to a JSON string.
pub fn to_json(tree: &ConversationTree) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&encode(tree))?)
}

/// Parse and decode a JSON string.
pub fn from_json(json: &str) -> Result<ConversationTree, CodecError> {
    let record: NodeRecord = serde_json::from_str(json)?;
    decode(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Conversation;

    fn record(id: &str, role: Role, children: Vec<NodeRecord>) -> NodeRecord {
        NodeRecord {
            id: NodeId::from(id),
            role,
            content: format!("{id} content"),
            timestamp: Utc::now(),
            children,
        }
    }

    fn flat(id: &str, parent: Option<&str>, role: Role) -> FlatNode {
        FlatNode {
            id: NodeId::from(id),
            parent: parent.map(NodeId::from),
            role,
            content: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_encode_preserves_child_order() {
        let mut tree = ConversationTree::new("Start");
        let root = tree.root_id().clone();
        let a = tree.add_child(&root, Node::new(Role::User, "a")).unwrap();
        let b = tree.add_child(&root, Node::new(Role::User, "b")).unwrap();
        tree.add_child(&a, Node::new(Role::Model, "a1")).unwrap();

        let rec = encode(&tree);
        let ids: Vec<_> = rec.children.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(rec.role, Role::System);
        assert_eq!(rec.children[0].children[0].content, "a1");
    }

    #[test]
    fn test_flat_form_lists_parents_first() {
        let rec = record(
            "r",
            Role::System,
            vec![
                record("q1", Role::User, vec![record("a1", Role::Model, vec![])]),
                record("q2", Role::User, vec![]),
            ],
        );
        let flat = FlatTree::from(rec.clone());
        let order: Vec<_> = flat
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.parent.as_ref().map(|p| p.as_str())))
            .collect();
        assert_eq!(
            order,
            vec![
                ("r", None),
                ("q1", Some("r")),
                ("a1", Some("q1")),
                ("q2", Some("r")),
            ]
        );
        assert_eq!(NodeRecord::try_from(flat).unwrap(), rec);
    }

    #[test]
    fn test_deep_conversation_round_trips_through_json() {
        let mut conv = Conversation::new();
        for i in 0..150 {
            conv.ask(format!("question {i}"));
            conv.append_reply(format!("answer {i}"));
        }
        assert_eq!(conv.tree().depth(conv.cursor()), Some(300));

        let json = to_json(conv.tree()).unwrap();
        let decoded = from_json(&json).unwrap();
        assert_eq!(&decoded, conv.tree());
    }

    #[test]
    fn test_flat_tree_rejects_bad_structure() {
        let empty = NodeRecord::try_from(FlatTree::default()).unwrap_err();
        assert!(matches!(empty, CodecError::EmptyRecord));

        let orphan = FlatTree {
            nodes: vec![flat("r", None, Role::System), flat("q", Some("ghost"), Role::User)],
        };
        assert!(matches!(
            NodeRecord::try_from(orphan),
            Err(CodecError::UnknownParent { parent, .. }) if parent.as_str() == "ghost"
        ));

        let two_roots = FlatTree {
            nodes: vec![flat("r", None, Role::System), flat("s", None, Role::System)],
        };
        assert!(matches!(
            NodeRecord::try_from(two_roots),
            Err(CodecError::ExtraRoot(id)) if id.as_str() == "s"
        ));

        let duplicate = FlatTree {
            nodes: vec![flat("r", None, Role::System), flat("r", Some("r"), Role::User)],
        };
        assert!(matches!(
            NodeRecord::try_from(duplicate),
            Err(CodecError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_system_root() {
        let err = decode(&record("r", Role::User, vec![])).unwrap_err();
        assert!(matches!(err, CodecError::RootNotSystem { .. }));
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let rec = record(
            "r",
            Role::System,
            vec![
                record("x", Role::User, vec![]),
                record("x", Role::User, vec![]),
            ],
        );
        let err = decode(&rec).unwrap_err();
        assert!(matches!(err, CodecError::DuplicateId(id) if id.as_str() == "x"));
    }

    #[test]
    fn test_decode_rejects_empty_id() {
        let rec = record(
            "r",
            Role::System,
            vec![record("q", Role::User, vec![record("", Role::Model, vec![])])],
        );
        let err = decode(&rec).unwrap_err();
        assert!(matches!(err, CodecError::EmptyId { depth: 2 }));
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            from_json("{\"nodes\": ["),
            Err(CodecError::Malformed(_))
        ));
        let unknown_role = r#"{"nodes":[{"id":"r","role":"assistant","content":"","timestamp":"2024-01-01T00:00:00Z"}]}"#;
        assert!(matches!(
            from_json(unknown_role),
            Err(CodecError::Malformed(_))
        ));
        let orphan = r#"{"nodes":[
            {"id":"r","role":"system","content":""},
            {"id":"q","parent":"ghost","role":"user","content":""}
        ]}"#;
        assert!(matches!(
            from_json(orphan),
            Err(CodecError::Malformed(e)) if e.to_string().contains("ghost")
        ));
    }

    #[test]
    fn test_missing_timestamp_defaults_to_load_time() {
        let before = Utc::now();
        let json = r#"{"nodes":[
            {"id":"r","role":"system","content":"Start"},
            {"id":"q","parent":"r","role":"user","content":"hi","timestamp":"2024-01-01T00:00:00Z"}
        ]}"#;
        let tree = from_json(json).unwrap();

        assert_eq!(tree.len(), 2);
        assert!(tree.root().created_at() >= before);
        let q = tree.find_by_id(&NodeId::from("q")).unwrap();
        assert_eq!(q.created_at().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
