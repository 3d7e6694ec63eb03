//! bookfuse-api - Read-only catalog HTTP service

use anyhow::{Context, Result};
use bookfuse_api::{build_router, AppState};
use bookfuse_common::config::{load_toml_config, resolve_data_dir};
use clap::Parser;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_PORT: u16 = 8000;

#[derive(Parser)]
#[command(name = "bookfuse-api", about = "Read-only book catalog API")]
struct Cli {
    /// Data directory (overrides BOOKFUSE_DATA and the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    info!("Starting bookfuse-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let paths = resolve_data_dir(cli.data_dir.as_deref());
    let db_path = paths.database_path();
    info!("Database: {}", db_path.display());

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let db = SqlitePool::connect(&db_url)
        .await
        .context("Failed to open catalog database (run `bookfuse load` first)")?;

    let port = cli
        .port
        .or_else(|| load_toml_config().ok().and_then(|c| c.api_port))
        .unwrap_or(DEFAULT_PORT);

    let app = build_router(AppState::new(db));

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
