//! Conversation/turn data model and the SQLite vector store adapter.

pub mod sqlite;
pub mod traits;
pub mod types;

pub use self::traits::TurnStore;
pub use self::types::{Conversation, NewTurn, Role, SimilarityMatch, Turn};
