mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::migrate::intent_from_flags;
use commands::MigrateArgs;

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "sift CLI - index migrations for Elasticsearch-compatible engines")]
#[command(version)]
struct Cli {
    /// Client configuration file (default: ~/.sift/config.toml)
    #[arg(long, global = true, env = "SIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, update or recreate an index from its YAML definition
    Migrate {
        /// Index definition file
        descriptor: PathBuf,

        /// Close the index, push settings and mappings, reopen
        #[arg(long, conflicts_with = "recreate")]
        update: bool,

        /// Build a new generation and move the alias to it
        #[arg(long)]
        recreate: bool,

        /// Skip loading data into the new index
        #[arg(long)]
        no_backfill: bool,

        /// Backfill the new index by reindexing from this index or alias
        #[arg(long)]
        reindex_from: Option<String>,
    },

    /// Show the physical generation behind an alias
    Status {
        alias: String,

        /// Connection pool to use
        #[arg(long, default_value = "default")]
        pool: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Migrate {
            descriptor,
            update,
            recreate,
            no_backfill,
            reindex_from,
        } => {
            let failed = commands::run_migrate(MigrateArgs {
                descriptor,
                intent: intent_from_flags(update, recreate),
                backfill: !no_backfill,
                reindex_from,
                config: cli.config,
                json: cli.json,
            })
            .await?;
            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status { alias, pool } => {
            commands::run_status(&alias, &pool, cli.config.as_deref()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
