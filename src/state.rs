// src/state.rs

//! Shared application state wired behind the pipeline traits so tests can
//! substitute an in-memory store or fake clients without touching handlers.

use std::sync::Arc;

use crate::config::CONFIG;
use crate::llm::{Embedder, Generator};
use crate::memory::TurnStore;
use crate::orchestrator::{RetrievalParams, TurnOrchestrator};
use crate::persona::PersonaOverlay;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TurnStore>,
    pub orchestrator: Arc<TurnOrchestrator>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TurnStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let (similarity_threshold, top_k, recent_limit) = CONFIG.retrieval_config();
        let orchestrator = Arc::new(TurnOrchestrator::new(
            store.clone(),
            embedder,
            generator,
            PersonaOverlay::Default,
            RetrievalParams {
                similarity_threshold,
                top_k,
                recent_limit,
            },
        ));

        Self {
            store,
            orchestrator,
        }
    }
}
