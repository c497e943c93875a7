//! History linearization: root-to-node path as model input

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, Role};
use crate::tree::ConversationTree;

/// One `(role, content)` pair of a linearized path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The path from the root down to (and including) a node, in chronological
/// order. `nodes[i]` is the node that produced `messages[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History {
    pub messages: Vec<HistoryMessage>,
    pub nodes: Vec<NodeId>,
}

impl History {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true for a history produced by [`history`]; it always holds the root.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages to send to a model: everything except `system` entries.
    pub fn for_model(&self) -> Vec<HistoryMessage> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect()
    }

    /// Iterate `(node id, message)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&NodeId, &HistoryMessage)> {
        self.nodes.iter().zip(self.messages.iter())
    }
}

/// Linearize the path from the root to `id`. `None` if the node is unknown.
pub fn history(tree: &ConversationTree, id: &NodeId) -> Option<History> {
    if !tree.contains(id) {
        return None;
    }

    let (mut nodes, mut messages): (Vec<_>, Vec<_>) = tree
        .ancestors(id)
        .map(|n| {
            (
                n.id().clone(),
                HistoryMessage::new(n.role(), n.content()),
            )
        })
        .unzip();
    nodes.reverse();
    messages.reverse();

    Some(History { messages, nodes })
}
