// src/api/mod.rs

pub mod error;
pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/conversations", post(handlers::create_conversation))
        .route(
            "/conversations/{id}/turns",
            post(handlers::submit_turn).get(handlers::conversation_history),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
