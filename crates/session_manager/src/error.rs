//! Session manager error types

use chat_tree::CodecError;
use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Conversation not found")]
    NotFound,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid conversation data: {0}")]
    Codec(#[from] CodecError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The model call failed; the user turn that triggered it is still in the tree.
    #[error("Error: {0}")]
    Upstream(#[from] LlmError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
