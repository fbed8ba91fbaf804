// tests/orchestrator_test.rs
// End-to-end runs of the turn state machine against an in-memory store and
// fake clients, including the short-circuit guarantees on failure.

mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use common::{insert_turn_at, setup_store, topic_vector, CountingStore, FakeEmbedder, FakeGenerator, DIM};
use solotutor::error::{PipelineError, Stage};
use solotutor::memory::types::Role;
use solotutor::memory::TurnStore;
use solotutor::orchestrator::{RetrievalParams, TurnOrchestrator, TurnRequest};
use solotutor::persona::PersonaOverlay;

fn params() -> RetrievalParams {
    RetrievalParams {
        similarity_threshold: 0.5,
        top_k: 5,
        recent_limit: 10,
    }
}

fn orchestrator(
    store: Arc<dyn TurnStore>,
    embedder: Arc<FakeEmbedder>,
    generator: Arc<FakeGenerator>,
) -> TurnOrchestrator {
    TurnOrchestrator::new(store, embedder, generator, PersonaOverlay::Default, params())
}

fn request(conversation_id: &str, user_id: &str, text: &str) -> TurnRequest {
    TurnRequest {
        conversation_id: conversation_id.to_string(),
        user_id: user_id.to_string(),
        text: text.to_string(),
        image_ref: None,
    }
}

// Scenario: brand-new conversation with no history at all.
#[tokio::test]
async fn test_first_turn_of_new_conversation() {
    let store = setup_store().await;
    let conversation = store.create_conversation("ada", None).await.unwrap();
    let embedder = FakeEmbedder::new();
    let generator = FakeGenerator::new("Block in the shadow side first.");
    let orch = orchestrator(store.clone(), embedder.clone(), generator.clone());

    let outcome = orch
        .run(request(&conversation.id, "ada", "How do I shade a sphere?"))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Block in the shadow side first.");
    assert_ne!(outcome.user_turn_id, outcome.assistant_turn_id);

    // Empty history still generates; the context handed over was empty.
    assert_eq!(generator.seen_context().unwrap(), "");

    // Exactly two turns persisted, user then assistant, both embedded.
    let turns = store.recent_turns(&conversation.id, 10).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);
    assert!(turns.iter().all(|t| t.embedding.as_ref().map(|e| e.len()) == Some(DIM)));

    // One embedding for the user text, one for the reply.
    assert_eq!(embedder.call_count(), 2);
}

// Scenario: long mixed history; on-topic turns surface through similarity,
// the recent window is chronological regardless of topic, and overlap is
// deduplicated into the recent block.
#[tokio::test]
async fn test_retrieval_surfaces_on_topic_history() {
    let store = setup_store().await;
    let conversation = store.create_conversation("ada", None).await.unwrap();
    let base = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();

    for i in 0..20 {
        insert_turn_at(
            &store.pool,
            &conversation.id,
            if i % 2 == 0 { Role::User } else { Role::Assistant },
            &format!("color mixing note {}", i),
            Some(&topic_vector("color")),
            base + Duration::minutes(i),
        )
        .await;
    }
    for i in 0..3 {
        insert_turn_at(
            &store.pool,
            &conversation.id,
            Role::User,
            &format!("hand proportions question {}", i),
            Some(&topic_vector("hand")),
            base + Duration::hours(2) + Duration::minutes(i),
        )
        .await;
    }

    let embedder = FakeEmbedder::new();
    let generator = FakeGenerator::new("Compare your palm-to-finger ratio.");
    let orch = orchestrator(store.clone(), embedder, generator.clone());

    let outcome = orch
        .run(request(&conversation.id, "ada", "how do I fix my hand drawing"))
        .await
        .unwrap();
    assert!(!outcome.reply.is_empty());

    let context = generator.seen_context().unwrap();

    // All three hand turns are visible; the unrelated ones scored below the
    // threshold and never entered the relevant block.
    assert!(context.contains("hand proportions question 0"));
    assert!(context.contains("hand proportions question 1"));
    assert!(context.contains("hand proportions question 2"));
    assert!(context.contains("## Relevant history") || context.contains("## Recent conversation"));

    // The recent window is the chronological tail regardless of topic.
    assert!(context.contains("## Recent conversation"));
    assert!(context.contains("color mixing note 19"));

    // Hand turns are recent enough to land in both sets; each appears once.
    for i in 0..3 {
        let needle = format!("hand proportions question {}", i);
        assert_eq!(context.matches(needle.as_str()).count(), 1, "{} duplicated", needle);
    }
}

#[tokio::test]
async fn test_embedding_failure_short_circuits_everything() {
    let store = setup_store().await;
    let conversation = store.create_conversation("ada", None).await.unwrap();
    let counting = CountingStore::new(store.clone());
    let embedder = FakeEmbedder::failing();
    let generator = FakeGenerator::new("unused");
    let orch = orchestrator(counting.clone(), embedder, generator.clone());

    let err = orch
        .run(request(&conversation.id, "ada", "How do I shade a sphere?"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Embedding(_)));
    assert_eq!(err.stage(), Stage::Embedding);

    // No retrieval, no generation, no writes.
    assert_eq!(counting.retrieval_calls(), 0);
    assert_eq!(generator.call_count(), 0);
    assert!(store.recent_turns(&conversation.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generation_failure_leaves_no_orphan_user_turn() {
    let store = setup_store().await;
    let conversation = store.create_conversation("ada", None).await.unwrap();
    let embedder = FakeEmbedder::new();
    let generator = FakeGenerator::failing();
    let orch = orchestrator(store.clone(), embedder, generator);

    let err = orch
        .run(request(&conversation.id, "ada", "How do I shade a sphere?"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Generation(_)));
    assert_eq!(err.stage(), Stage::Generating);

    // Including the user's own message: zero turns written.
    assert!(store.recent_turns(&conversation.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_embedding_failure_reports_unsaved_reply() {
    let store = setup_store().await;
    let conversation = store.create_conversation("ada", None).await.unwrap();
    let embedder = FakeEmbedder::failing_on_second_call();
    let generator = FakeGenerator::new("Keep your light source consistent.");
    let orch = orchestrator(store.clone(), embedder, generator);

    let err = orch
        .run(request(&conversation.id, "ada", "How do I shade a sphere?"))
        .await
        .unwrap_err();

    // The reply exists but could not be memorized; the caller gets it back
    // tagged as a Persisting-stage condition, never a silent drop.
    match &err {
        PipelineError::ReplyNotSaved { reply, .. } => {
            assert_eq!(reply, "Keep your light source consistent.");
        }
        other => panic!("expected ReplyNotSaved, got {:?}", other),
    }
    assert_eq!(err.stage(), Stage::Persisting);

    // The user turn was already durable when the failure hit.
    let turns = store.recent_turns(&conversation.id, 10).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
}

#[tokio::test]
async fn test_ownership_and_input_validation() {
    let store = setup_store().await;
    let conversation = store.create_conversation("ada", None).await.unwrap();
    let orch = orchestrator(
        store.clone(),
        FakeEmbedder::new(),
        FakeGenerator::new("unused"),
    );

    let err = orch
        .run(request(&conversation.id, "bob", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotOwner { .. }));

    let err = orch.run(request("missing", "ada", "hello")).await.unwrap_err();
    assert!(matches!(err, PipelineError::ConversationNotFound(_)));

    let err = orch
        .run(request(&conversation.id, "ada", "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyUserText));

    assert!(store.recent_turns(&conversation.id, 10).await.unwrap().is_empty());
}
