//! Conversation storage trait and implementations

use crate::error::{Result, SessionError};
use async_trait::async_trait;
use chat_tree::{ConversationTree, NodeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const UNTITLED: &str = "New Conversation";
const TITLE_LEN: usize = 50;

/// A saved conversation, keyed by its root node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConversation {
    pub id: String,
    pub title: String,
    pub tree: NodeRecord,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry, without the tree payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredConversation> for ConversationSummary {
    fn from(stored: &StoredConversation) -> Self {
        Self {
            id: stored.id.clone(),
            title: stored.title.clone(),
            updated_at: stored.updated_at,
        }
    }
}

/// Title shown in conversation lists: the first question, shortened.
pub fn conversation_title(tree: &ConversationTree) -> String {
    match tree.first_user_node() {
        Some(node) => {
            let head: String = node.content().chars().take(TITLE_LEN).collect();
            format!("{head}...")
        }
        None => UNTITLED.to_string(),
    }
}

/// Conversation storage trait
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Load a conversation
    async fn load(&self, id: &str) -> Result<StoredConversation>;

    /// Save (insert or replace) a conversation
    async fn save(&self, conversation: &StoredConversation) -> Result<()>;

    /// Summaries of every saved conversation, most recently updated first
    async fn list(&self) -> Result<Vec<ConversationSummary>>;

    /// Check if a conversation exists
    async fn exists(&self, id: &str) -> bool;

    /// Delete a conversation
    async fn delete(&self, id: &str) -> Result<()>;
}

/// File-based conversation storage: one JSON file per conversation.
#[derive(Clone)]
pub struct FileConversationStorage {
    base_path: PathBuf,
}

impl FileConversationStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn conversation_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SessionError::Validation(format!(
                "invalid conversation id: {id:?}"
            )));
        }
        Ok(self.base_path.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl ConversationStorage for FileConversationStorage {
    async fn load(&self, id: &str) -> Result<StoredConversation> {
        let path = self.conversation_path(id)?;

        if !path.exists() {
            return Err(SessionError::NotFound);
        }

        let contents = fs::read_to_string(&path).await?;
        let conversation: StoredConversation = serde_json::from_str(&contents)?;

        Ok(conversation)
    }

    async fn save(&self, conversation: &StoredConversation) -> Result<()> {
        let path = self.conversation_path(&conversation.id)?;

        fs::create_dir_all(&self.base_path).await?;
        let contents = serde_json::to_string_pretty(conversation)?;
        fs::write(&path, contents).await?;

        tracing::debug!(
            id = %conversation.id,
            path = %path.display(),
            "Conversation written"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<StoredConversation>(&contents) {
                Ok(stored) => summaries.push(ConversationSummary::from(&stored)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable conversation file");
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn exists(&self, id: &str) -> bool {
        self.conversation_path(id).map(|p| p.exists()).unwrap_or(false)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.conversation_path(id)?;

        if path.exists() {
            fs::remove_file(&path).await?;
        }

        Ok(())
    }
}
