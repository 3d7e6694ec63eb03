//! bookfuse - Book catalog reconciliation CLI
//!
//! Builds the fused catalog artifact from the checkpointed source
//! state, loads it into the SQLite database the read API serves from,
//! and reports coverage statistics. Enrichment collectors run behind
//! the library's `SourceCollector` boundary and are wired in by
//! deployment-specific binaries, not this CLI.

use anyhow::{Context, Result};
use bookfuse_common::config::resolve_data_dir;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bookfuse_ingest::pipeline::{build_catalog, read_final_catalog};
use bookfuse_ingest::stats::{format_stats, gather_stats};
use bookfuse_ingest::storage::{init_catalog_pool, load_final_catalog};

#[derive(Parser)]
#[command(name = "bookfuse", about = "Multi-source book catalog reconciliation")]
struct Cli {
    /// Data directory (overrides BOOKFUSE_DATA and the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge and fuse the checkpointed sources into the final artifact
    Build,
    /// Load the final artifact into the catalog database
    Load,
    /// Report per-source status counts and fused coverage
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    info!("Starting bookfuse");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let paths = resolve_data_dir(cli.data_dir.as_deref());
    paths
        .ensure_directories()
        .context("Failed to initialize data directory")?;
    info!("Data directory: {}", paths.data_dir.display());

    match cli.command {
        Command::Build => {
            let records = build_catalog(&paths).context("Failed to build catalog")?;
            println!(
                "Built {} rows -> {}",
                records.len(),
                paths.final_catalog_csv().display()
            );
        }
        Command::Load => {
            let records = read_final_catalog(&paths.final_catalog_csv())
                .context("Failed to read final artifact (run `bookfuse build` first)")?;
            let pool = init_catalog_pool(&paths.database_path())
                .await
                .context("Failed to open catalog database")?;
            let loaded = load_final_catalog(&pool, &records).await?;
            println!("Loaded {} rows -> {}", loaded, paths.database_path().display());
        }
        Command::Stats => {
            let stats = gather_stats(&paths).context("Failed to gather stats")?;
            print!("{}", format_stats(&stats));
        }
    }

    Ok(())
}
