// src/memory/traits.rs

//! Storage trait for conversations and turns. All persistence and recall
//! goes through this—no direct DB calls in the orchestrator, which keeps it
//! testable against an in-memory store.

use async_trait::async_trait;

use crate::memory::types::{Conversation, NewTurn, SimilarityMatch, Turn};

#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Create a conversation for a user; first interaction creates the thread.
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> anyhow::Result<Conversation>;

    /// Fetch a conversation by id, `None` when it does not exist.
    async fn get_conversation(&self, conversation_id: &str) -> anyhow::Result<Option<Conversation>>;

    /// Bump `updated_at` after a completed exchange.
    async fn touch_conversation(&self, conversation_id: &str) -> anyhow::Result<()>;

    /// Single atomic write of one turn, embedding included. No partial row
    /// (text without embedding, or vice versa) is ever visible to readers.
    async fn insert_turn(&self, turn: NewTurn) -> anyhow::Result<Turn>;

    /// Most recent `limit` turns of one conversation, returned oldest-first
    /// so the caller already has conversational reading order.
    async fn recent_turns(&self, conversation_id: &str, limit: usize) -> anyhow::Result<Vec<Turn>>;

    /// Nearest neighbors by cosine similarity across ALL of one user's
    /// conversations. Results are ordered by descending score (ties broken
    /// by ascending creation time), truncated to `top_k`, and exclude any
    /// turn scoring at or below `threshold` or lacking an embedding.
    async fn find_similar(
        &self,
        query: &[f32],
        user_id: &str,
        threshold: f32,
        top_k: usize,
    ) -> anyhow::Result<Vec<SimilarityMatch>>;
}
