// src/orchestrator/mod.rs

//! Turn orchestrator - the core state machine of the tutor pipeline.
//!
//! One stateless run per submitted turn:
//!
//! ```text
//! Embedding → Retrieving → Assembling → Generating → Persisting → Complete
//!      │           │                         │            │
//!      └───────────┴──── Failed(stage) ◄─────┴────────────┘
//! ```
//!
//! Every stage depends on the previous stage's output except the two reads
//! in Retrieving (similarity search + recent fetch), which run concurrently.
//! No stage swallows an earlier stage's error; there is no degraded mode
//! that silently drops long-term memory.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::context::{assemble, render};
use crate::error::PipelineError;
use crate::llm::{Embedder, Generator};
use crate::memory::types::{NewTurn, Role};
use crate::memory::TurnStore;
use crate::persona::PersonaOverlay;

/// Everything the caller provides for one turn. The user identifier comes
/// from the session layer and is trusted as given; the image reference is
/// an already-resolved URL, never raw bytes.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub text: String,
    pub image_ref: Option<String>,
}

/// Successful completion: both turns are durable.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub user_turn_id: String,
    pub assistant_turn_id: String,
    pub elapsed_ms: u64,
}

/// Retrieval bounds for one run; defaults come from config at the API layer.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub similarity_threshold: f32,
    pub top_k: usize,
    pub recent_limit: usize,
}

pub struct TurnOrchestrator {
    store: Arc<dyn TurnStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    persona: PersonaOverlay,
    params: RetrievalParams,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn TurnStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        persona: PersonaOverlay,
        params: RetrievalParams,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            persona,
            params,
        }
    }

    /// Run one turn end-to-end. On failure nothing is persisted, except the
    /// narrow `ReplyNotSaved` window where the user turn may already be
    /// durable (see the Persisting stage below).
    pub async fn run(&self, request: TurnRequest) -> Result<TurnOutcome, PipelineError> {
        let started = Instant::now();

        if request.text.trim().is_empty() {
            return Err(PipelineError::EmptyUserText);
        }

        // Ownership check before any external call: the conversation must
        // exist and belong to the requesting user.
        let conversation = self
            .store
            .get_conversation(&request.conversation_id)
            .await
            .map_err(PipelineError::Retrieval)?
            .ok_or_else(|| PipelineError::ConversationNotFound(request.conversation_id.clone()))?;
        if conversation.user_id != request.user_id {
            return Err(PipelineError::NotOwner {
                conversation_id: request.conversation_id.clone(),
                user_id: request.user_id.clone(),
            });
        }

        // ── Embedding: vectorize the incoming text. The vector is reused
        // at Persisting; it is never recomputed.
        let user_embedding = self.embedder.embed(&request.text).await?;

        // ── Retrieving: long-term memory spans all of the user's
        // conversations, the recent window only the current one. Neither
        // read depends on the other, so they run concurrently.
        let (matches, recent) = tokio::try_join!(
            self.store.find_similar(
                &user_embedding,
                &request.user_id,
                self.params.similarity_threshold,
                self.params.top_k,
            ),
            self.store
                .recent_turns(&request.conversation_id, self.params.recent_limit),
        )
        .map_err(PipelineError::Retrieval)?;

        info!(
            target: "orchestrator",
            conversation_id = %request.conversation_id,
            similar = matches.len(),
            recent = recent.len(),
            "retrieval complete"
        );

        // ── Assembling: pure, cannot fail; empty history is a valid input.
        let context = assemble(matches, recent);

        // ── Generating: nothing has been written yet, so a failure here
        // leaves no orphan user turn behind.
        let reply = self
            .generator
            .generate(
                self.persona.prompt(),
                &render(&context),
                &request.text,
                request.image_ref.as_deref(),
            )
            .await?;

        // ── Persisting: user turn first, then the assistant turn. The
        // assistant needs its own embedding; once the user turn has landed,
        // any failure is reported as "reply generated but not saved" so the
        // generated advice is not silently dropped.
        let outcome = self
            .persist_exchange(&request, user_embedding, reply, started)
            .await?;

        Ok(outcome)
    }

    async fn persist_exchange(
        &self,
        request: &TurnRequest,
        user_embedding: Vec<f32>,
        reply: String,
        started: Instant,
    ) -> Result<TurnOutcome, PipelineError> {
        let user_turn = self
            .store
            .insert_turn(NewTurn {
                conversation_id: request.conversation_id.clone(),
                role: Role::User,
                content: request.text.clone(),
                image_ref: request.image_ref.clone(),
                embedding: user_embedding,
            })
            .await
            .map_err(PipelineError::Persistence)?;

        // Fresh embedding for the generated text. A failure here is a
        // Persisting-stage condition: the reply exists and must be reported
        // back even though it could not be memorized.
        let assistant_embedding = match self.embedder.embed(&reply).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(target: "orchestrator", %err, "assistant embedding failed after generation");
                return Err(PipelineError::ReplyNotSaved {
                    reply,
                    message: format!("assistant embedding failed: {}", err),
                });
            }
        };

        let assistant_turn = match self
            .store
            .insert_turn(NewTurn {
                conversation_id: request.conversation_id.clone(),
                role: Role::Assistant,
                content: reply.clone(),
                image_ref: None,
                embedding: assistant_embedding,
            })
            .await
        {
            Ok(turn) => turn,
            Err(err) => {
                warn!(target: "orchestrator", %err, "assistant turn write failed after generation");
                return Err(PipelineError::ReplyNotSaved {
                    reply,
                    message: format!("assistant turn write failed: {}", err),
                });
            }
        };

        // Best-effort bump of the conversation clock; the exchange itself
        // is already durable.
        if let Err(err) = self.store.touch_conversation(&request.conversation_id).await {
            warn!(target: "orchestrator", %err, "failed to touch conversation");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            target: "orchestrator",
            conversation_id = %request.conversation_id,
            user_turn = %user_turn.id,
            assistant_turn = %assistant_turn.id,
            elapsed_ms,
            "turn complete"
        );

        Ok(TurnOutcome {
            reply,
            user_turn_id: user_turn.id,
            assistant_turn_id: assistant_turn.id,
            elapsed_ms,
        })
    }
}
