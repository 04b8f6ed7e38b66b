use anyhow::{Context, Result};
use sift::migration::{MigrationIntent, MigrationReport, Migrator, ReindexBackfill};
use sift_http::{ClientConfig, ClientFactory};
use std::path::PathBuf;
use std::sync::Arc;

pub struct MigrateArgs {
    pub descriptor: PathBuf,
    pub intent: MigrationIntent,
    pub backfill: bool,
    pub reindex_from: Option<String>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// Pick the intent from the mutually exclusive flags
pub fn intent_from_flags(update: bool, recreate: bool) -> MigrationIntent {
    match (update, recreate) {
        (true, _) => MigrationIntent::Update,
        (_, true) => MigrationIntent::Recreate,
        _ => MigrationIntent::Create,
    }
}

/// Run a migration and print its report. Returns whether it failed.
pub async fn run_migrate(args: MigrateArgs) -> Result<bool> {
    let mut descriptor = sift::index::load_definition(&args.descriptor)
        .with_context(|| format!("Failed to load index definition {:?}", args.descriptor))?;

    if let Some(source) = &args.reindex_from {
        descriptor = descriptor.with_backfill(Arc::new(ReindexBackfill::new(source.clone())));
    }

    let config = ClientConfig::load_or_default(args.config.as_deref())
        .context("Failed to load client configuration")?;
    let factory = ClientFactory::new(config)?;
    let client = factory
        .for_descriptor(&descriptor)
        .with_context(|| format!("No client for pool '{}'", descriptor.pool()))?;

    let report = Migrator::new(client)
        .run(&descriptor, args.intent, args.backfill)
        .await;

    print_report(&report, args.json)?;
    Ok(report.is_failed())
}

fn print_report(report: &MigrationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", report.message());
    if let Some(previous) = &report.previous_index {
        println!("  previous index: {}", previous);
    }
    if let Some(physical) = &report.physical_index {
        println!("  new index:      {}", physical);
    }
    let steps: Vec<&str> = report.steps.iter().map(|s| s.as_str()).collect();
    println!("  steps:          {}", steps.join(" -> "));
    Ok(())
}
