// src/memory/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An ownership-scoped chat thread. Created on a user's first interaction;
/// only `title` and `updated_at` ever change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which side of the exchange a turn belongs to. Immutable once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Parse Role from strings defensively (DB/text interop)
impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(anyhow::anyhow!("unknown turn role: {}", other)),
        }
    }
}

/// One persisted message within a conversation. Immutable once written;
/// the embedding is only `None` transiently, before the embedding step of
/// the pipeline completes, and such turns are never visible to retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Resolved URL of an attached image; never raw bytes.
    pub image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// A turn to be written, before the store assigns identity and timestamp.
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub image_ref: Option<String>,
    pub embedding: Vec<f32>,
}

/// Ephemeral projection of a turn plus its cosine similarity to the query
/// vector. Lives only within a single retrieval call; never persisted.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub turn: Turn,
    pub score: f32,
}
