// src/error.rs

//! Stage-tagged failure taxonomy for the turn pipeline.
//! Every failure carries the stage it originated in so the API layer can
//! render stage-appropriate messaging instead of a generic 500.

use serde::Serialize;
use thiserror::Error;

/// Pipeline stage names, used both for error tagging and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embedding,
    Retrieving,
    Generating,
    Persisting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Generating => "generating",
            Stage::Persisting => "persisting",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by the embedding client. Never defaulted to a zero vector;
/// a zero vector would silently corrupt every similarity ranking built on it.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding input is empty after trimming")]
    EmptyInput,
    #[error("embedding service unavailable: {0}")]
    Upstream(String),
    #[error("embedding service rate limited: {0}")]
    RateLimited(String),
    #[error("embedding request timed out after {0}s")]
    Timeout(u64),
    #[error("embedding response malformed: {0}")]
    Malformed(String),
    #[error("embedding has dimension {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },
}

impl EmbeddingError {
    /// Transient upstream conditions are worth a bounded retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::Upstream(_) | EmbeddingError::RateLimited(_) | EmbeddingError::Timeout(_)
        )
    }
}

/// Errors raised by the generation client, kept distinct from
/// [`EmbeddingError`] so callers can apply different retry policies.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service unavailable: {0}")]
    Upstream(String),
    #[error("generation service rate limited: {0}")]
    RateLimited(String),
    #[error("generation request timed out after {0}s")]
    Timeout(u64),
    #[error("generation response malformed: {0}")]
    Malformed(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Upstream(_) | GenerationError::RateLimited(_) | GenerationError::Timeout(_)
        )
    }
}

/// Terminal pipeline failure, tagged with the stage that produced it.
/// `ReplyNotSaved` is the one deliberate exception to "no partial success
/// fields": the reply already exists and dropping it silently would present
/// the user an answer they can never retrieve again.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("retrieval failed: {0}")]
    Retrieval(anyhow::Error),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("persistence failed: {0}")]
    Persistence(anyhow::Error),

    #[error("reply generated but not saved: {message}")]
    ReplyNotSaved { reply: String, message: String },

    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    #[error("conversation {conversation_id} is not owned by user {user_id}")]
    NotOwner {
        conversation_id: String,
        user_id: String,
    },

    #[error("user text must be non-empty")]
    EmptyUserText,
}

impl PipelineError {
    /// The stage tag surfaced to callers. Input validation and ownership
    /// failures happen before the state machine starts, so they report the
    /// first stage they would have blocked.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Embedding(_) | PipelineError::EmptyUserText => Stage::Embedding,
            PipelineError::Retrieval(_)
            | PipelineError::ConversationNotFound(_)
            | PipelineError::NotOwner { .. } => Stage::Retrieving,
            PipelineError::Generation(_) => Stage::Generating,
            PipelineError::Persistence(_) | PipelineError::ReplyNotSaved { .. } => Stage::Persisting,
        }
    }
}
