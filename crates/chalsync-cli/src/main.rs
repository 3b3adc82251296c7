use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chalsync_storage::PgChallengeStore;
use chalsync_sync::SyncConfig;

#[derive(Debug, Parser)]
#[command(name = "chalsync")]
#[command(about = "Synchronize challenge problem files into the database")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pull the problems checkout and upsert one record per markdown file.
    Sync,
    /// Apply the embedded database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let summary = chalsync_sync::run_sync_once_from_env().await?;
            println!(
                "sync complete: run_id={} scanned={} created={} updated={} duplicates_skipped={}",
                summary.run_id,
                summary.scanned_files,
                summary.created,
                summary.updated,
                summary.skipped_duplicates
            );
        }
        Commands::Migrate => {
            let config = SyncConfig::from_env();
            let store = PgChallengeStore::connect(&config.database_url)
                .await
                .context("connecting to challenge database")?;
            store.run_migrations().await?;
            println!("migrations applied");
        }
    }

    Ok(())
}
