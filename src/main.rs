// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use solotutor::api;
use solotutor::config::CONFIG;
use solotutor::llm::{EmbeddingClient, GenerationClient, RetryPolicy};
use solotutor::memory::sqlite::{run_migrations, SqliteTurnStore};
use solotutor::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "solotutor", about = "Solo Tutor retrieval-augmented chat backend")]
struct Args {
    /// Bind host (overrides TUTOR_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides TUTOR_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(CONFIG.log_level.parse().unwrap_or(tracing::Level::INFO))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Solo Tutor backend");
    info!("Embedding model: {} ({}d)", CONFIG.embedding_model, CONFIG.embedding_dimensions);
    info!("Generation model: {}", CONFIG.generation_model);

    let database_url = args.database_url.unwrap_or_else(|| CONFIG.database_url.clone());
    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.sqlite_max_connections)
        .connect(&database_url)
        .await?;
    run_migrations(&pool).await?;

    let retry = RetryPolicy::from_config();
    let store = Arc::new(SqliteTurnStore::new(pool));
    let embedder = Arc::new(EmbeddingClient::new(retry)?);
    let generator = Arc::new(GenerationClient::new(retry)?);

    let state = AppState::new(store, embedder, generator);
    let app = api::router(state);

    let host = args.host.unwrap_or_else(|| CONFIG.host.clone());
    let port = args.port.unwrap_or(CONFIG.port);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
