//! Session Manager service
//!
//! Drives a [`ChatSession`] through its model calls and saves/loads its
//! conversation. Every operation takes the session by `&mut`, so a session
//! sees at most one in-flight model call.

use std::sync::Arc;

use chat_tree::{decode, encode, Conversation, NodeId};
use chrono::Utc;

use crate::actions::{ActionOutcome, BranchStart, RequestParams};
use crate::config::{ModelCatalog, ModelSpec};
use crate::error::{Result, SessionError};
use crate::llm::ChatModel;
use crate::registry::{SessionRegistry, SharedSession};
use crate::storage::{conversation_title, ConversationStorage, ConversationSummary, StoredConversation};
use crate::structs::ChatSession;

pub struct SessionManager<S: ConversationStorage> {
    storage: Arc<S>,
    model: Arc<dyn ChatModel>,
    catalog: ModelCatalog,
    registry: SessionRegistry,
}

impl<S: ConversationStorage> SessionManager<S> {
    pub fn new(storage: S, model: Arc<dyn ChatModel>, catalog: ModelCatalog) -> Self {
        Self {
            storage: Arc::new(storage),
            model,
            catalog,
            registry: SessionRegistry::new(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Get or create the session for `session_id`, using the catalog's
    /// default model for new sessions.
    pub async fn session(&self, session_id: &str) -> SharedSession {
        self.registry
            .session(session_id, self.catalog.default_key())
            .await
    }

    pub async fn drop_session(&self, session_id: &str) -> bool {
        self.registry.remove(session_id).await
    }

    /// Ask `prompt` under the cursor and wait for the model's answer.
    ///
    /// Returns the reply node. If the model call fails the user turn stays in
    /// the tree with the cursor on it, so it can be retried.
    pub async fn submit_prompt(&self, session: &mut ChatSession, prompt: &str) -> Result<NodeId> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::Validation("prompt is empty".to_string()));
        }
        // Fail before touching the tree if the selected model is unknown.
        self.catalog.get(&session.settings.model_key)?;

        let user_node = session.conversation.ask(prompt);
        session.touch();
        self.answer(session, &user_node).await
    }

    /// Ask the model again for a user turn that has no reply.
    pub async fn retry_reply(&self, session: &mut ChatSession) -> Result<NodeId> {
        if !session.conversation.awaiting_reply() {
            return Err(SessionError::Validation(
                "the current message is not an unanswered question".to_string(),
            ));
        }
        let user_node = session.conversation.cursor().clone();
        self.answer(session, &user_node).await
    }

    /// Apply pending delete and navigate requests.
    pub fn process_url_actions(
        &self,
        session: &mut ChatSession,
        params: &mut RequestParams,
    ) -> Vec<ActionOutcome> {
        session.process_url_actions(params)
    }

    /// Handle a pending branch-from-selection request, if any, through to the
    /// model's reply. The branch guard is cleared whether the call succeeds
    /// or fails.
    pub async fn process_branching(
        &self,
        session: &mut ChatSession,
        params: &mut RequestParams,
    ) -> Option<ActionOutcome> {
        let pending = match session.begin_branch(params) {
            BranchStart::NoRequest => return None,
            BranchStart::Ignored(outcome) => return Some(outcome),
            BranchStart::Started(pending) => pending,
        };

        let result = self.answer(session, &pending.user_node).await;
        session.finish_branch();

        Some(match result {
            Ok(reply_node) => ActionOutcome::Branched {
                user_node: pending.user_node,
                reply_node,
            },
            Err(e) => {
                tracing::warn!(
                    node = %pending.user_node,
                    error = %e,
                    "Branch reply failed"
                );
                ActionOutcome::BranchFailed {
                    user_node: pending.user_node,
                    error: e.to_string(),
                }
            }
        })
    }

    /// Call the model with the history ending at `user_node` and attach its
    /// answer under that node.
    async fn answer(&self, session: &mut ChatSession, user_node: &NodeId) -> Result<NodeId> {
        let spec: ModelSpec = self.catalog.get(&session.settings.model_key)?.clone();
        // The reply is attached at the cursor, so it must sit on `user_node`.
        if !session.conversation.navigate(user_node) {
            return Err(SessionError::NotFound);
        }
        let messages = session.conversation.history().for_model();
        let params = session.settings.params(&spec);

        let reply = self.model.generate(&messages, &params).await?;

        let cost = session.usage.record(reply.usage, &spec.pricing);
        let reply_node = session.conversation.append_reply(reply.text);
        session.touch();

        tracing::info!(
            node = %reply_node,
            model = %spec.id,
            input_tokens = reply.usage.input_tokens,
            output_tokens = reply.usage.output_tokens,
            cost,
            "Model reply recorded"
        );
        Ok(reply_node)
    }

    /// Save the session's tree under its root id.
    pub async fn save_conversation(&self, session: &ChatSession) -> Result<ConversationSummary> {
        let tree = session.conversation.tree();
        let stored = StoredConversation {
            id: tree.root_id().to_string(),
            title: conversation_title(tree),
            tree: encode(tree),
            updated_at: Utc::now(),
        };
        self.storage.save(&stored).await?;

        tracing::info!(id = %stored.id, nodes = tree.len(), "Conversation saved");
        Ok(ConversationSummary::from(&stored))
    }

    /// Replace the session's tree with a saved one. The current tree is
    /// saved first unless it is still empty.
    pub async fn load_conversation(&self, session: &mut ChatSession, id: &str) -> Result<()> {
        if !session.conversation.tree().is_empty() {
            self.save_conversation(session).await?;
        }

        let stored = self.storage.load(id).await?;
        let tree = decode(&stored.tree)?;
        let nodes = tree.len();
        session.replace_conversation(Conversation::from_tree(tree));

        tracing::info!(id, nodes, "Conversation loaded");
        Ok(())
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.storage.list().await
    }
}
