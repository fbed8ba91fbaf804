// src/llm/mod.rs

pub mod embeddings;
pub mod generation;
pub mod retry;

pub use embeddings::{Embedder, EmbeddingClient};
pub use generation::{GenerationClient, Generator};
pub use retry::RetryPolicy;
