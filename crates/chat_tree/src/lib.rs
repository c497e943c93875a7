//! chat_tree - Conversation tree engine
//!
//! Every message can spawn an alternative continuation, so a conversation is a
//! tree rather than a transcript. This crate provides:
//! - `node` / `tree` - Node model and the arena that owns it
//! - `history` - Linearizing a root-to-node path into model input
//! - `label` - Hierarchical question numbering ("2.1.3")
//! - `active_path` - Cursor ancestry, pinned/active flags
//! - `conversation` - Tree mutations that keep the cursor valid
//! - `codec` - Persistence-neutral record format
//! - `view` - Sidebar and transcript projections for renderers

pub mod active_path;
pub mod codec;
pub mod conversation;
pub mod error;
pub mod history;
pub mod label;
pub mod node;
pub mod tree;
pub mod view;

// Re-export commonly used types
pub use active_path::{paired_reply, ActivePath};
pub use codec::{decode, encode, FlatNode, FlatTree, NodeRecord};
pub use conversation::{Conversation, DeleteOutcome, ROOT_CONTENT};
pub use error::{CodecError, TreeError};
pub use history::{history, History, HistoryMessage};
pub use label::question_label;
pub use node::{Node, NodeId, Role};
pub use tree::ConversationTree;
pub use view::{sidebar, transcript, SidebarEntry, Transcript, TranscriptEntry};
