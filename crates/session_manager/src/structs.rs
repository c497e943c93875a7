//! Session data structures

use chat_tree::{sidebar, transcript, Conversation, NodeId, SidebarEntry, Transcript};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ModelPricing, ModelSpec};
use crate::error::{Result, SessionError};
use crate::llm::{GenerationParams, TokenUsage};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SEED: u64 = 42;
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Generation knobs chosen by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Key into the model catalog
    pub model_key: String,
    temperature: f32,
    pub seed: u64,
}

impl GenerationSettings {
    pub fn new(model_key: impl Into<String>) -> Self {
        Self {
            model_key: model_key.into(),
            temperature: DEFAULT_TEMPERATURE,
            seed: DEFAULT_SEED,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(SessionError::Validation(format!(
                "temperature must be between 0.0 and {MAX_TEMPERATURE}, got {temperature}"
            )));
        }
        self.temperature = temperature;
        Ok(())
    }

    /// Parameters for a call to `model`.
    pub fn params(&self, model: &ModelSpec) -> GenerationParams {
        GenerationParams {
            model: model.id.clone(),
            temperature: self.temperature,
            seed: self.seed,
        }
    }
}

/// Token and cost totals accumulated by a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// USD
    pub total_cost: f64,
}

impl UsageTotals {
    /// Add one call's usage and return that call's cost.
    pub fn record(&mut self, usage: TokenUsage, pricing: &ModelPricing) -> f64 {
        let cost = call_cost(usage, pricing);
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.total_cost += cost;
        cost
    }
}

pub fn call_cost(usage: TokenUsage, pricing: &ModelPricing) -> f64 {
    (usage.input_tokens as f64 / 1_000_000.0) * pricing.input_per_1m
        + (usage.output_tokens as f64 / 1_000_000.0) * pricing.output_per_1m
}

/// A branch request that has created its user turn and is waiting for the
/// model. Keyed by the literal selected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBranch {
    pub text: String,
    pub user_node: NodeId,
}

/// Everything one chat session owns: its tree and cursor, settings, usage and
/// view flags. Sessions share nothing with each other.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub conversation: Conversation,
    pub settings: GenerationSettings,
    pub usage: UsageTotals,
    /// Transcript shows every message instead of only the last exchange.
    pub show_full_history: bool,
    pub(crate) pending_branch: Option<PendingBranch>,
    pub last_updated: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(model_key: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(),
            settings: GenerationSettings::new(model_key),
            usage: UsageTotals::default(),
            show_full_history: false,
            pending_branch: None,
            last_updated: Utc::now(),
        }
    }

    /// Conversations are stored under their root node id.
    pub fn conversation_id(&self) -> &NodeId {
        self.conversation.tree().root_id()
    }

    pub fn pending_branch(&self) -> Option<&PendingBranch> {
        self.pending_branch.as_ref()
    }

    /// Go back to the root to start a fresh line of questions; existing
    /// branches stay in the tree.
    pub fn new_chat(&mut self) {
        self.conversation.reset_to_root();
        self.show_full_history = false;
        self.touch();
    }

    pub fn unfold(&mut self) {
        self.show_full_history = true;
    }

    /// Swap in a different (e.g. freshly loaded) conversation.
    pub fn replace_conversation(&mut self, conversation: Conversation) {
        self.conversation = conversation;
        self.show_full_history = false;
        self.pending_branch = None;
        self.touch();
    }

    pub fn sidebar(&self) -> Vec<SidebarEntry> {
        sidebar(self.conversation.tree(), self.conversation.cursor())
    }

    pub fn transcript(&self) -> Transcript {
        transcript(
            self.conversation.tree(),
            self.conversation.cursor(),
            self.show_full_history,
        )
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
