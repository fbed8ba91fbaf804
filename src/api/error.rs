// src/api/error.rs
// Centralized error responses: every pipeline failure maps to a JSON body
// with a stage tag so the UI can render stage-appropriate messaging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::PipelineError;

#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub stage: Option<&'static str>,
    /// Populated only for the "reply generated but not saved" condition.
    pub unsaved_reply: Option<String>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            stage: None,
            unsaved_reply: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
            stage: None,
            unsaved_reply: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::NOT_FOUND,
            stage: None,
            unsaved_reply: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::FORBIDDEN,
            stage: None,
            unsaved_reply: None,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let stage = Some(err.stage().as_str());
        let status_code = match &err {
            PipelineError::EmptyUserText => StatusCode::BAD_REQUEST,
            PipelineError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::NotOwner { .. } => StatusCode::FORBIDDEN,
            PipelineError::Embedding(_) | PipelineError::Generation(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Retrieval(_) | PipelineError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::ReplyNotSaved { .. } => StatusCode::BAD_GATEWAY,
        };
        let unsaved_reply = match &err {
            PipelineError::ReplyNotSaved { reply, .. } => Some(reply.clone()),
            _ => None,
        };

        Self {
            message: err.to_string(),
            status_code,
            stage,
            unsaved_reply,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!(
                target: "api",
                stage = self.stage.unwrap_or("none"),
                status = self.status_code.as_u16(),
                "{}",
                self.message
            );
        }

        let mut body = json!({
            "error": self.message,
            "stage": self.stage,
        });
        if let Some(reply) = self.unsaved_reply {
            body["unsaved_reply"] = json!(reply);
        }

        (self.status_code, Json(body)).into_response()
    }
}
