//! Action processor: out-of-band requests against the current tree
//!
//! Hosts deliver requests as named parameters alongside each render:
//! `navigate_node_id`, `delete_node_id` and `branch_text`. A parameter is
//! removed as soon as it is read, whatever the outcome, so a reload cannot
//! replay it. Branch requests are also guarded by the pending branch recorded
//! on the session, because a host may render again before the reply arrives.

use std::collections::HashMap;

use chat_tree::{NodeId, Role};

use crate::structs::{ChatSession, PendingBranch};

pub const NAVIGATE_NODE_ID: &str = "navigate_node_id";
pub const DELETE_NODE_ID: &str = "delete_node_id";
pub const BRANCH_TEXT: &str = "branch_text";

pub const DELETE_CONFIRMATION: &str = "Analysis branch deleted.";

/// Request parameters as delivered by the host.
pub type RequestParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(NodeId),
    Delete(NodeId),
    BranchFromSelection(String),
}

impl Action {
    /// Parameter name that carries this action.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Navigate(_) => NAVIGATE_NODE_ID,
            Self::Delete(_) => DELETE_NODE_ID,
            Self::BranchFromSelection(_) => BRANCH_TEXT,
        }
    }

    /// Queue this action on `params` the way a host would deliver it.
    pub fn enqueue(&self, params: &mut RequestParams) {
        let value = match self {
            Self::Navigate(id) | Self::Delete(id) => id.to_string(),
            Self::BranchFromSelection(text) => text.clone(),
        };
        params.insert(self.key().to_string(), value);
    }
}

/// Prompt used for a branch created from selected text.
pub fn branch_prompt(selection: &str) -> String {
    format!("Please explain {selection}")
}

/// Remove `key` from `params`, returning its value when it is non-empty.
fn take_param(params: &mut RequestParams, key: &str) -> Option<String> {
    params.remove(key).filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Deleted {
        node: NodeId,
        new_cursor: Option<NodeId>,
        message: &'static str,
    },
    Navigated {
        node: NodeId,
    },
    Branched {
        user_node: NodeId,
        reply_node: NodeId,
    },
    /// The user turn stays in the tree; the cursor is left on it.
    BranchFailed {
        user_node: NodeId,
        error: String,
    },
    Ignored {
        action: Action,
        reason: &'static str,
    },
}

/// Result of reading the branch parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchStart {
    NoRequest,
    /// A user turn was created and is waiting for its reply.
    Started(PendingBranch),
    Ignored(ActionOutcome),
}

impl ChatSession {
    /// Apply pending delete and navigate requests, in that order.
    pub fn process_url_actions(&mut self, params: &mut RequestParams) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::new();

        if let Some(id) = take_param(params, DELETE_NODE_ID) {
            outcomes.push(self.apply_delete(NodeId::from(id)));
        }
        if let Some(id) = take_param(params, NAVIGATE_NODE_ID) {
            outcomes.push(self.apply_navigate(NodeId::from(id)));
        }

        outcomes
    }

    fn apply_delete(&mut self, node: NodeId) -> ActionOutcome {
        let outcome = self.conversation.delete_subtree(&node);
        if !outcome.deleted {
            return ActionOutcome::Ignored {
                action: Action::Delete(node),
                reason: "root or unknown node",
            };
        }

        self.touch();
        ActionOutcome::Deleted {
            node,
            new_cursor: outcome.new_cursor,
            message: DELETE_CONFIRMATION,
        }
    }

    fn apply_navigate(&mut self, node: NodeId) -> ActionOutcome {
        if !self.conversation.navigate(&node) {
            tracing::warn!(node = %node, "Navigate request for unknown node");
            return ActionOutcome::Ignored {
                action: Action::Navigate(node),
                reason: "unknown node",
            };
        }

        self.show_full_history = false;
        self.touch();
        ActionOutcome::Navigated { node }
    }

    /// Read the branch parameter and, if it is new, create its user turn under
    /// the cursor. The caller obtains the reply and then calls
    /// [`finish_branch`](ChatSession::finish_branch).
    pub fn begin_branch(&mut self, params: &mut RequestParams) -> BranchStart {
        let Some(text) = take_param(params, BRANCH_TEXT) else {
            return BranchStart::NoRequest;
        };

        if let Some(pending) = self.pending_branch.clone() {
            let duplicate = text == pending.text;
            let action = Action::BranchFromSelection(text);
            let reason = if !self.branch_in_flight(&pending) {
                tracing::warn!(
                    text = %pending.text,
                    node = %pending.user_node,
                    "Clearing stale branch guard"
                );
                self.pending_branch = None;
                "stale branch request"
            } else if duplicate {
                tracing::debug!(text = %pending.text, "Duplicate branch request ignored");
                "branch request already applied"
            } else {
                tracing::warn!(
                    pending = %pending.text,
                    "Branch request dropped while another reply is pending"
                );
                "another branch is awaiting its reply"
            };
            return BranchStart::Ignored(ActionOutcome::Ignored { action, reason });
        }

        let user_node = self.conversation.ask(branch_prompt(&text));
        let pending = PendingBranch { text, user_node };
        self.pending_branch = Some(pending.clone());
        self.touch();

        tracing::info!(
            text = %pending.text,
            node = %pending.user_node,
            "Branch from selection started"
        );
        BranchStart::Started(pending)
    }

    /// Clear the branch guard once the reply has completed, successfully or not.
    pub fn finish_branch(&mut self) -> Option<PendingBranch> {
        self.pending_branch.take()
    }

    /// The pending user turn still exists and has no reply.
    fn branch_in_flight(&self, pending: &PendingBranch) -> bool {
        let tree = self.conversation.tree();
        tree.contains(&pending.user_node)
            && !tree
                .children_of(&pending.user_node)
                .any(|c| c.role() == Role::Model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_with(action: Action) -> RequestParams {
        let mut params = RequestParams::new();
        action.enqueue(&mut params);
        params
    }

    #[test]
    fn test_delete_action_confirms_and_clears_param() {
        let mut session = ChatSession::new("m");
        let q = session.conversation.ask("q");
        session.conversation.append_reply("a");

        let mut params = params_with(Action::Delete(q.clone()));
        let outcomes = session.process_url_actions(&mut params);

        assert!(params.is_empty());
        assert_eq!(
            outcomes,
            vec![ActionOutcome::Deleted {
                node: q,
                new_cursor: Some(session.conversation_id().clone()),
                message: DELETE_CONFIRMATION,
            }]
        );
    }

    #[test]
    fn test_delete_root_is_silent_noop() {
        let mut session = ChatSession::new("m");
        session.conversation.ask("q");
        let root = session.conversation_id().clone();

        let mut params = params_with(Action::Delete(root));
        let outcomes = session.process_url_actions(&mut params);

        assert!(params.is_empty());
        assert!(matches!(outcomes[0], ActionOutcome::Ignored { .. }));
        assert_eq!(session.conversation.tree().len(), 2);
    }

    #[test]
    fn test_navigate_resets_history_fold() {
        let mut session = ChatSession::new("m");
        let q = session.conversation.ask("q");
        session.conversation.append_reply("a");
        session.unfold();

        let mut params = params_with(Action::Navigate(q.clone()));
        params.insert("other".to_string(), "kept".to_string());
        let outcomes = session.process_url_actions(&mut params);

        assert_eq!(outcomes, vec![ActionOutcome::Navigated { node: q.clone() }]);
        assert_eq!(session.conversation.cursor(), &q);
        assert!(!session.show_full_history);
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("other"));
    }

    #[test]
    fn test_navigate_unknown_clears_param() {
        let mut session = ChatSession::new("m");
        let mut params = params_with(Action::Navigate(NodeId::from("ghost")));
        let outcomes = session.process_url_actions(&mut params);
        assert!(params.is_empty());
        assert!(matches!(outcomes[0], ActionOutcome::Ignored { .. }));
    }

    #[test]
    fn test_delete_runs_before_navigate() {
        let mut session = ChatSession::new("m");
        let q = session.conversation.ask("q");
        let a = session.conversation.append_reply("a");

        let mut params = RequestParams::new();
        Action::Delete(q).enqueue(&mut params);
        Action::Navigate(a).enqueue(&mut params);
        let outcomes = session.process_url_actions(&mut params);

        assert!(matches!(outcomes[0], ActionOutcome::Deleted { .. }));
        assert!(matches!(outcomes[1], ActionOutcome::Ignored { .. }));
        assert_eq!(session.conversation.cursor(), session.conversation_id());
    }

    #[test]
    fn test_same_branch_twice_creates_one_user_node() {
        let mut session = ChatSession::new("m");
        session.conversation.ask("Explain gravity");
        let answer = session.conversation.append_reply("...");

        let mut params = params_with(Action::BranchFromSelection("gravity".into()));
        let BranchStart::Started(pending) = session.begin_branch(&mut params) else {
            panic!("expected a started branch");
        };
        assert!(params.is_empty());

        // Host renders again before the reply arrives and re-delivers the request.
        let mut params = params_with(Action::BranchFromSelection("gravity".into()));
        let again = session.begin_branch(&mut params);
        assert!(matches!(again, BranchStart::Ignored(_)));
        assert!(params.is_empty());

        let tree = session.conversation.tree();
        assert_eq!(tree.find_by_id(&answer).unwrap().children().len(), 1);
        assert_eq!(
            tree.find_by_id(&pending.user_node).unwrap().content(),
            "Please explain gravity"
        );
        assert_eq!(session.conversation.cursor(), &pending.user_node);
    }

    #[test]
    fn test_different_branch_while_pending_is_dropped() {
        let mut session = ChatSession::new("m");
        let mut params = params_with(Action::BranchFromSelection("a".into()));
        session.begin_branch(&mut params);

        let mut params = params_with(Action::BranchFromSelection("b".into()));
        assert!(matches!(session.begin_branch(&mut params), BranchStart::Ignored(_)));
        assert_eq!(session.conversation.tree().len(), 2);
        assert_eq!(session.pending_branch().unwrap().text, "a");
    }

    #[test]
    fn test_stale_guard_is_cleared() {
        let mut session = ChatSession::new("m");
        let mut params = params_with(Action::BranchFromSelection("x".into()));
        let BranchStart::Started(pending) = session.begin_branch(&mut params) else {
            panic!("expected a started branch");
        };

        // The pending user turn is deleted before the host finishes the branch.
        session.conversation.delete_subtree(&pending.user_node);

        let mut params = params_with(Action::BranchFromSelection("x".into()));
        assert!(matches!(session.begin_branch(&mut params), BranchStart::Ignored(_)));
        assert!(session.pending_branch().is_none());
        assert_eq!(session.conversation.tree().len(), 1);

        // With the guard gone, a new request goes through.
        let mut params = params_with(Action::BranchFromSelection("x".into()));
        assert!(matches!(session.begin_branch(&mut params), BranchStart::Started(_)));
    }

    #[test]
    fn test_finish_branch_clears_guard() {
        let mut session = ChatSession::new("m");
        let mut params = params_with(Action::BranchFromSelection("x".into()));
        session.begin_branch(&mut params);

        let finished = session.finish_branch().unwrap();
        assert_eq!(finished.text, "x");
        assert!(session.pending_branch().is_none());
        assert_eq!(session.begin_branch(&mut RequestParams::new()), BranchStart::NoRequest);
    }

    #[test]
    fn test_empty_branch_text_is_cleared_without_effect() {
        let mut session = ChatSession::new("m");
        let mut params = RequestParams::new();
        params.insert(BRANCH_TEXT.to_string(), "   ".to_string());
        assert_eq!(session.begin_branch(&mut params), BranchStart::NoRequest);
        assert!(params.is_empty());
        assert_eq!(session.conversation.tree().len(), 1);
    }
}
