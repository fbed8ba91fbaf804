// src/config/mod.rs
// All tunables load from the environment (.env supported); defaults are
// suitable for local development against an in-memory pipeline.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct TutorConfig {
    // ── Upstream API configuration
    pub api_base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub generation_model: String,
    pub max_output_tokens: usize,

    // ── Database configuration
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Retrieval configuration
    pub similarity_threshold: f32,
    pub vector_search_k: usize,
    pub recent_turns_limit: usize,

    // ── Retry / timeout configuration (seconds unless noted)
    pub embedding_timeout: u64,
    pub generation_timeout: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,

    // ── Server configuration
    pub host: String,
    pub port: u16,

    // ── Logging
    pub log_level: String,
}

// Parses `KEY=value # comment` style entries tolerantly: strip comments and
// whitespace, fall back to the default when parsing fails.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl TutorConfig {
    pub fn from_env() -> Self {
        // .env is optional; plain environment variables always win.
        let _ = dotenvy::dotenv();

        Self {
            api_base_url: env_var_or("TUTOR_API_BASE_URL", "https://api.openai.com/v1".to_string()),
            embedding_model: env_var_or("TUTOR_EMBEDDING_MODEL", "text-embedding-3-small".to_string()),
            embedding_dimensions: env_var_or("TUTOR_EMBEDDING_DIMENSIONS", 1536),
            generation_model: env_var_or("TUTOR_GENERATION_MODEL", "gpt-4o".to_string()),
            max_output_tokens: env_var_or("TUTOR_MAX_OUTPUT_TOKENS", 1024),
            database_url: env_var_or("DATABASE_URL", "sqlite:./solotutor.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 5),
            similarity_threshold: env_var_or("TUTOR_SIMILARITY_THRESHOLD", 0.55),
            vector_search_k: env_var_or("TUTOR_VECTOR_SEARCH_K", 5),
            recent_turns_limit: env_var_or("TUTOR_RECENT_TURNS_LIMIT", 10),
            embedding_timeout: env_var_or("TUTOR_EMBEDDING_TIMEOUT", 15),
            generation_timeout: env_var_or("TUTOR_GENERATION_TIMEOUT", 60),
            retry_max_attempts: env_var_or("TUTOR_RETRY_MAX_ATTEMPTS", 3),
            retry_base_delay_ms: env_var_or("TUTOR_RETRY_BASE_DELAY_MS", 250),
            retry_max_delay_ms: env_var_or("TUTOR_RETRY_MAX_DELAY_MS", 4000),
            host: env_var_or("TUTOR_HOST", "0.0.0.0".to_string()),
            port: env_var_or("TUTOR_PORT", 8080),
            log_level: env_var_or("TUTOR_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Full URL for an upstream API path, tolerant of slashes on either side.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Retrieval parameters as a tuple for one-line destructuring.
    pub fn retrieval_config(&self) -> (f32, usize, usize) {
        (
            self.similarity_threshold,
            self.vector_search_k,
            self.recent_turns_limit,
        )
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<TutorConfig> = Lazy::new(TutorConfig::from_env);
