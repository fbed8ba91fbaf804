//! Implements TurnStore for SQLite, the single relational store behind the
//! pipeline. Embeddings live beside their rows as little-endian f32 BLOBs;
//! similarity is cosine over the owner's candidate rows, computed in-process.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::llm::embeddings::utils::cosine_similarity;
use crate::memory::traits::TurnStore;
use crate::memory::types::{Conversation, NewTurn, Role, SimilarityMatch, Turn};

pub struct SqliteTurnStore {
    pub pool: SqlitePool,
}

impl SqliteTurnStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Helper to convert a vector to Vec<u8> for BLOB storage
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    // Helper to convert BLOB (Vec<u8>) back to Vec<f32>
    fn blob_to_embedding(blob: Option<Vec<u8>>) -> Option<Vec<f32>> {
        blob.map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
                .collect()
        })
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<Turn> {
        let role: String = row.get("role");
        let created_at: NaiveDateTime = row.get("created_at");

        Ok(Turn {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            role: role.parse::<Role>()?,
            content: row.get("content"),
            image_ref: row.get("image_ref"),
            embedding: Self::blob_to_embedding(row.get("embedding")),
            created_at: Utc.from_utc_datetime(&created_at),
        })
    }
}

#[async_trait]
impl TurnStore for SqliteTurnStore {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(&conversation.user_id)
        .bind(&conversation.title)
        .bind(conversation.created_at.naive_utc())
        .bind(conversation.updated_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM conversations
            WHERE id = ?
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let created_at: NaiveDateTime = row.get("created_at");
            let updated_at: NaiveDateTime = row.get("updated_at");
            Conversation {
                id: row.get("id"),
                user_id: row.get("user_id"),
                title: row.get("title"),
                created_at: Utc.from_utc_datetime(&created_at),
                updated_at: Utc.from_utc_datetime(&updated_at),
            }
        }))
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversations SET updated_at = ? WHERE id = ?
            "#,
        )
        .bind(Utc::now().naive_utc())
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_turn(&self, turn: NewTurn) -> Result<Turn> {
        let saved = Turn {
            id: Uuid::new_v4().to_string(),
            conversation_id: turn.conversation_id,
            role: turn.role,
            content: turn.content,
            image_ref: turn.image_ref,
            embedding: Some(turn.embedding),
            created_at: Utc::now(),
        };

        // Single-row INSERT: readers either see the complete turn with its
        // embedding, or nothing at all.
        sqlx::query(
            r#"
            INSERT INTO turns (id, conversation_id, role, content, image_ref, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&saved.id)
        .bind(&saved.conversation_id)
        .bind(saved.role.as_str())
        .bind(&saved.content)
        .bind(&saved.image_ref)
        .bind(Self::embedding_to_blob(saved.embedding.as_deref().unwrap_or_default()))
        .bind(saved.created_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn recent_turns(&self, conversation_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, role, content, image_ref, embedding, created_at
            FROM turns
            WHERE conversation_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(conversation_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut turns = rows
            .iter()
            .map(Self::row_to_turn)
            .collect::<Result<Vec<_>>>()?;

        // Newest-N selected above; flip into reading order for the caller.
        turns.reverse();
        Ok(turns)
    }

    async fn find_similar(
        &self,
        query: &[f32],
        user_id: &str,
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<SimilarityMatch>> {
        // Long-term memory spans every conversation the user owns; the join
        // is what keeps one user's history out of another's retrieval.
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.conversation_id, t.role, t.content, t.image_ref, t.embedding, t.created_at
            FROM turns t
            JOIN conversations c ON c.id = t.conversation_id
            WHERE c.user_id = ? AND t.embedding IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::new();
        for row in &rows {
            let turn = Self::row_to_turn(row)?;
            let score = match turn.embedding.as_deref() {
                Some(embedding) => cosine_similarity(query, embedding).clamp(0.0, 1.0),
                None => continue,
            };
            if score > threshold {
                matches.push(SimilarityMatch { turn, score });
            }
        }

        // Descending score; equal scores prefer older turns so foundational
        // context wins the tie.
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.turn.created_at.cmp(&b.turn.created_at))
        });
        matches.truncate(top_k);

        Ok(matches)
    }
}
