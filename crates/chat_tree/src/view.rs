//! View projections for renderers
//!
//! The engine does not produce markup. It hands renderers flat records
//! carrying everything a sidebar or chat transcript needs: role, text,
//! question label, pinned/active flags and the id to act on when clicked.

use serde::Serialize;

use crate::active_path::{paired_reply, ActivePath};
use crate::history::history;
use crate::label::question_label;
use crate::node::{Node, NodeId, Role};
use crate::tree::ConversationTree;

/// Characters kept in sidebar previews.
pub const PREVIEW_LEN: usize = 25;

/// One row of the navigation sidebar.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SidebarEntry {
    pub node_id: NodeId,
    /// Node to navigate to (or delete) when this row is acted on. For a
    /// question with an answer this is the answer.
    pub target_id: NodeId,
    pub role: Role,
    pub preview: String,
    pub label: Option<String>,
    pub pinned: bool,
    pub active: bool,
    pub depth: usize,
    /// The row is a question folded together with its reply.
    pub has_reply: bool,
    pub deletable: bool,
}

/// Build the sidebar rows for `tree` with the cursor at `cursor`.
///
/// The system root is not listed; its children sit at depth 0.
pub fn sidebar(tree: &ConversationTree, cursor: &NodeId) -> Vec<SidebarEntry> {
    let path = ActivePath::from_cursor(tree, cursor);
    let mut entries = Vec::new();
    for child in tree.children_of(tree.root_id()) {
        push_entry(tree, &path, child, 0, &mut entries);
    }
    entries
}

fn push_entry(
    tree: &ConversationTree,
    path: &ActivePath,
    node: &Node,
    depth: usize,
    out: &mut Vec<SidebarEntry>,
) {
    let reply = paired_reply(tree, node.id());
    let target = reply.unwrap_or(node);

    out.push(SidebarEntry {
        node_id: node.id().clone(),
        target_id: target.id().clone(),
        role: node.role(),
        preview: preview(node.content()),
        label: question_label(tree, node.id()),
        pinned: path.is_pinned(tree, node.id()),
        active: path.is_active(tree, node.id()),
        depth,
        has_reply: reply.is_some(),
        deletable: !target.is_root(),
    });

    match reply {
        Some(reply) => {
            // Continuations hang off the reply; any other child of the question
            // (e.g. a second model answer from hand-edited data) is listed too.
            let nested = tree
                .children_of(reply.id())
                .chain(tree.children_of(node.id()).filter(|c| c.id() != reply.id()));
            for child in nested {
                push_entry(tree, path, child, depth + 1, out);
            }
        }
        None => {
            for child in tree.children_of(node.id()) {
                push_entry(tree, path, child, depth + 1, out);
            }
        }
    }
}

fn preview(content: &str) -> String {
    content
        .replace('\n', " ")
        .trim()
        .chars()
        .take(PREVIEW_LEN)
        .collect()
}

/// One visible message of the chat transcript.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub node_id: NodeId,
    pub role: Role,
    pub text: String,
    pub label: Option<String>,
}

/// The cursor's history without system turns, optionally folded.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
    /// Earlier messages folded away; zero when showing the full history.
    pub hidden_count: usize,
}

/// Build the transcript for the cursor.
///
/// Folded, only the last exchange is shown: the trailing question and
/// answer when the tip is a reply, or just the question when it is not.
pub fn transcript(tree: &ConversationTree, cursor: &NodeId, show_full: bool) -> Transcript {
    let Some(h) = history(tree, cursor) else {
        return Transcript::default();
    };

    let mut entries: Vec<TranscriptEntry> = h
        .entries()
        .filter(|(_, m)| m.role != Role::System)
        .map(|(id, m)| TranscriptEntry {
            node_id: id.clone(),
            role: m.role,
            text: m.content.clone(),
            label: question_label(tree, id),
        })
        .collect();

    let mut hidden_count = 0;
    if !show_full {
        if let Some(last) = entries.last() {
            let keep = if last.role == Role::Model { 2 } else { 1 };
            hidden_count = entries.len().saturating_sub(keep);
            entries.drain(..hidden_count);
        }
    }

    Transcript {
        entries,
        hidden_count,
    }
}
