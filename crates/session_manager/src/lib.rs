//! # Session Manager
//!
//! Per-session state around a [`chat_tree::Conversation`]: generation
//! settings, token usage, out-of-band actions (navigate, delete, branch from
//! selection), the model collaborator and conversation storage.

pub mod actions;
pub mod config;
pub mod error;
pub mod gemini;
pub mod llm;
pub mod manager;
pub mod registry;
pub mod storage;
pub mod structs;

// Re-exports
pub use actions::{
    branch_prompt, Action, ActionOutcome, BranchStart, RequestParams, BRANCH_TEXT,
    DELETE_CONFIRMATION, DELETE_NODE_ID, NAVIGATE_NODE_ID,
};
pub use config::{AppConfig, ModelCatalog, ModelPricing, ModelSpec};
pub use error::SessionError;
pub use gemini::GeminiClient;
pub use llm::{ChatModel, GenerationParams, LlmError, ModelReply, TokenUsage};
pub use manager::SessionManager;
pub use registry::{SessionRegistry, SharedSession};
pub use storage::{
    conversation_title, ConversationStorage, ConversationSummary, FileConversationStorage,
    StoredConversation,
};
pub use structs::{ChatSession, GenerationSettings, PendingBranch, UsageTotals};
