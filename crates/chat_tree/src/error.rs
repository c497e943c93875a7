//! Error types for chat_tree.

use thiserror::Error;

use crate::node::NodeId;

/// Structural errors raised by the node arena.
///
/// Higher-level operations (`Conversation::navigate`, `delete_subtree`, ...)
/// resolve these locally and report plain `bool`/`Option` results instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No node with this id exists in the tree.
    #[error("node `{0}` not found")]
    NotFound(NodeId),

    /// A node with this id is already part of the tree.
    #[error("node id `{0}` is already in use")]
    DuplicateId(NodeId),

    /// The operation is structurally not allowed (e.g. touching the root).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Errors raised while decoding a persisted tree record.
///
/// Decoding never yields a partial tree: the first problem aborts the load.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The payload is not a valid record (bad JSON, unknown role, bad timestamp).
    #[error("malformed tree record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The top-level record is not a `system` node.
    #[error("root record `{id}` has role `{role}`, expected `system`")]
    RootNotSystem { id: NodeId, role: String },

    /// A record carries an empty id.
    #[error("record at depth {depth} has an empty id")]
    EmptyId { depth: usize },

    /// Two records share an id.
    #[error("duplicate node id `{0}` in tree record")]
    DuplicateId(NodeId),

    #[error("tree record has no nodes")]
    EmptyRecord,

    /// A record other than the first has no parent.
    #[error("record `{0}` has no parent but is not the first record")]
    ExtraRoot(NodeId),

    /// A record names a parent that does not precede it.
    #[error("record `{id}` names unknown parent `{parent}`")]
    UnknownParent { id: NodeId, parent: NodeId },
}

pub type Result<T> = std::result::Result<T, TreeError>;
