// src/api/handlers.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;
use url::Url;

use crate::api::error::ApiError;
use crate::api::types::{
    ConversationResponse, CreateConversationRequest, HistoryQuery, HistoryResponse,
    SubmitTurnRequest, SubmitTurnResponse,
};
use crate::config::CONFIG;
use crate::orchestrator::TurnRequest;
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    if payload.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("user_id must be non-empty"));
    }

    let conversation = state
        .store
        .create_conversation(&payload.user_id, payload.title.as_deref())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    info!(target: "api", conversation_id = %conversation.id, "conversation created");
    Ok(Json(ConversationResponse { conversation }))
}

/// The core "submit turn" operation. The orchestration is spawned onto the
/// runtime so a client disconnect after generation has started cannot
/// cancel the run before both turns are durable.
pub async fn submit_turn(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(payload): Json<SubmitTurnRequest>,
) -> Result<Json<SubmitTurnResponse>, ApiError> {
    if let Some(image_ref) = payload.image_ref.as_deref() {
        Url::parse(image_ref)
            .map_err(|_| ApiError::bad_request("image_ref must be a resolvable URL"))?;
    }

    let request = TurnRequest {
        conversation_id,
        user_id: payload.user_id,
        text: payload.text,
        image_ref: payload.image_ref,
    };

    let orchestrator = state.orchestrator.clone();
    let outcome = tokio::spawn(async move { orchestrator.run(request).await })
        .await
        .map_err(|e| ApiError::internal(format!("turn task panicked: {}", e)))?
        .map_err(ApiError::from)?;

    Ok(Json(SubmitTurnResponse {
        reply: outcome.reply,
        user_turn_id: outcome.user_turn_id,
        assistant_turn_id: outcome.assistant_turn_id,
        elapsed_ms: outcome.elapsed_ms,
    }))
}

/// Upper bound on a single history page, whatever `?limit=` asks for.
const MAX_HISTORY_LIMIT: usize = 100;

pub async fn conversation_history(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conversation = state
        .store
        .get_conversation(&conversation_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("conversation not found"))?;

    // Same ownership rule as submit: history is readable only by the
    // conversation's owner.
    if conversation.user_id != query.user_id {
        return Err(ApiError::forbidden("conversation is not owned by this user"));
    }

    let limit = query
        .limit
        .unwrap_or(CONFIG.recent_turns_limit)
        .min(MAX_HISTORY_LIMIT);
    let turns = state
        .store
        .recent_turns(&conversation_id, limit)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(HistoryResponse {
        conversation_id,
        turns,
    }))
}
