// src/memory/sqlite/migration.rs
//! Startup migrations: ensures conversations/turns match the latest schema.

use anyhow::Result;
use sqlx::{Executor, SqlitePool};

const CREATE_CONVERSATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);
"#;

const CREATE_TURNS: &str = r#"
CREATE TABLE IF NOT EXISTS turns (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
    content TEXT NOT NULL,
    image_ref TEXT,
    embedding BLOB,
    created_at DATETIME NOT NULL,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);
"#;

const CREATE_TURNS_CONVERSATION_IDX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_turns_conversation_created
ON turns(conversation_id, created_at);
"#;

const CREATE_CONVERSATIONS_USER_IDX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_conversations_user
ON conversations(user_id);
"#;

/// Run all migrations. Idempotent; call at startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    pool.execute(CREATE_CONVERSATIONS).await?;
    pool.execute(CREATE_TURNS).await?;
    pool.execute(CREATE_TURNS_CONVERSATION_IDX).await?;
    pool.execute(CREATE_CONVERSATIONS_USER_IDX).await?;
    Ok(())
}
