// tests/common/mod.rs
// Shared fixtures: in-memory SQLite store plus fake embedding/generation
// clients implementing the pipeline traits.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use solotutor::error::{EmbeddingError, GenerationError};
use solotutor::llm::{Embedder, Generator};
use solotutor::memory::sqlite::{run_migrations, SqliteTurnStore};
use solotutor::memory::types::{Conversation, NewTurn, Role, SimilarityMatch, Turn};
use solotutor::memory::TurnStore;

pub const DIM: usize = 4;

/// In-memory SQLite store. One connection, so every query sees the same DB.
pub async fn setup_store() -> Arc<SqliteTurnStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("create in-memory sqlite");
    run_migrations(&pool).await.expect("run migrations");
    Arc::new(SqliteTurnStore::new(pool))
}

/// Insert a turn row with an explicit timestamp, for tests that need full
/// control over ordering and tie-breaks.
pub async fn insert_turn_at(
    pool: &SqlitePool,
    conversation_id: &str,
    role: Role,
    content: &str,
    embedding: Option<&[f32]>,
    created_at: DateTime<Utc>,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let blob = embedding.map(|e| e.iter().flat_map(|f| f.to_le_bytes()).collect::<Vec<u8>>());
    sqlx::query(
        r#"
        INSERT INTO turns (id, conversation_id, role, content, image_ref, embedding, created_at)
        VALUES (?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(conversation_id)
    .bind(role.as_str())
    .bind(content)
    .bind(blob)
    .bind(created_at.naive_utc())
    .execute(pool)
    .await
    .expect("insert turn row");
    id
}

/// Deterministic topic vectors: texts about the same topic embed
/// identically, unrelated topics are orthogonal.
pub fn topic_vector(text: &str) -> Vec<f32> {
    let t = text.to_lowercase();
    if t.contains("hand") {
        vec![1.0, 0.0, 0.0, 0.0]
    } else if t.contains("sphere") || t.contains("shade") {
        vec![0.0, 1.0, 0.0, 0.0]
    } else {
        vec![0.0, 0.0, 1.0, 0.0]
    }
}

/// Embedder fake: topic vectors, call counting, optional scripted failures.
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    /// Calls numbered from 1; any call in this list fails with an upstream
    /// error. Empty means always succeed.
    pub fail_on_calls: Vec<usize>,
}

impl FakeEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on_calls: Vec::new(),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on_calls: vec![1, 2, 3, 4, 5],
        })
    }

    /// Succeeds for the user text, fails when asked to embed the reply.
    pub fn failing_on_second_call() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on_calls: vec![2],
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_calls.contains(&call) {
            return Err(EmbeddingError::Upstream("simulated outage".into()));
        }
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(topic_vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Generator fake: canned reply, records the context it was handed.
pub struct FakeGenerator {
    pub reply: String,
    pub calls: AtomicUsize,
    pub fail: bool,
    pub last_context: Mutex<Option<String>>,
}

impl FakeGenerator {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            fail: false,
            last_context: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            calls: AtomicUsize::new(0),
            fail: true,
            last_context: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_context(&self) -> Option<String> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(
        &self,
        _persona: &str,
        context: &str,
        _user_text: &str,
        _image_ref: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::Upstream("simulated outage".into()));
        }
        *self.last_context.lock().unwrap() = Some(context.to_string());
        Ok(self.reply.clone())
    }
}

/// TurnStore wrapper that counts retrieval calls, for asserting that a
/// failed embedding short-circuits before any retrieval happens.
pub struct CountingStore {
    pub inner: Arc<SqliteTurnStore>,
    pub find_similar_calls: AtomicUsize,
    pub recent_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<SqliteTurnStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            find_similar_calls: AtomicUsize::new(0),
            recent_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
        })
    }

    pub fn retrieval_calls(&self) -> usize {
        self.find_similar_calls.load(Ordering::SeqCst) + self.recent_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TurnStore for CountingStore {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> anyhow::Result<Conversation> {
        self.inner.create_conversation(user_id, title).await
    }

    async fn get_conversation(&self, conversation_id: &str) -> anyhow::Result<Option<Conversation>> {
        self.inner.get_conversation(conversation_id).await
    }

    async fn touch_conversation(&self, conversation_id: &str) -> anyhow::Result<()> {
        self.inner.touch_conversation(conversation_id).await
    }

    async fn insert_turn(&self, turn: NewTurn) -> anyhow::Result<Turn> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_turn(turn).await
    }

    async fn recent_turns(&self, conversation_id: &str, limit: usize) -> anyhow::Result<Vec<Turn>> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.recent_turns(conversation_id, limit).await
    }

    async fn find_similar(
        &self,
        query: &[f32],
        user_id: &str,
        threshold: f32,
        top_k: usize,
    ) -> anyhow::Result<Vec<SimilarityMatch>> {
        self.find_similar_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_similar(query, user_id, threshold, top_k).await
    }
}
