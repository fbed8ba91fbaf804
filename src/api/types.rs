// src/api/types.rs
// Wire types for the HTTP surface. The user identifier arrives from the
// session layer upstream of this service and is trusted as given.

use serde::{Deserialize, Serialize};

use crate::memory::types::{Conversation, Turn};

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub user_id: String,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTurnRequest {
    pub user_id: String,
    pub text: String,
    /// Already-resolved image URL; raw bytes are never accepted here.
    pub image_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitTurnResponse {
    pub reply: String,
    pub user_turn_id: String,
    pub assistant_turn_id: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub turns: Vec<Turn>,
}
