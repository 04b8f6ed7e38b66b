use anyhow::{Context, Result};
use sift::migration::parse_generation;
use sift::AdminClient;
use sift_http::{ClientConfig, ClientFactory};
use std::path::Path;

/// Show which physical generation an alias currently points to
pub async fn run_status(alias: &str, pool: &str, config: Option<&Path>) -> Result<()> {
    let config = ClientConfig::load_or_default(config)
        .context("Failed to load client configuration")?;
    let factory = ClientFactory::new(config)?;
    let client = factory.get(pool)?;

    let targets = client.get_alias(alias).await?;
    if targets.is_empty() {
        println!("'{}' is not an alias", alias);
        return Ok(());
    }

    println!("Alias: {}", alias);
    for physical in targets.keys() {
        match parse_generation(alias, physical) {
            Some(n) => println!("  {} (generation {})", physical, n),
            None => println!("  {} (unmanaged)", physical),
        }
    }
    if targets.len() > 1 {
        tracing::warn!("'{}' points to {} indices; recreate will refuse it", alias, targets.len());
    }
    Ok(())
}
