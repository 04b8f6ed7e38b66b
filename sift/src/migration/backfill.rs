use crate::client::AdminClient;
use crate::{Error, Result};
use async_trait::async_trait;

/// Populates a freshly created physical index
///
/// Runs after the index exists and before any alias points at it.
#[async_trait]
pub trait Backfill: Send + Sync {
    async fn run(&self, index: &str, client: &dyn AdminClient) -> Result<()>;
}

/// Copies every document of a source index or alias through the reindex API
#[derive(Debug, Clone)]
pub struct ReindexBackfill {
    source: String,
}

impl ReindexBackfill {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[async_trait]
impl Backfill for ReindexBackfill {
    async fn run(&self, index: &str, client: &dyn AdminClient) -> Result<()> {
        let response = client
            .reindex(&self.source, index)
            .await
            .map_err(|e| Error::Backfill(format!("reindex {} -> {}: {}", self.source, index, e)))?;

        if let Some(failures) = response.get("failures").and_then(|f| f.as_array()) {
            if !failures.is_empty() {
                return Err(Error::Backfill(format!(
                    "reindex {} -> {} reported {} failures",
                    self.source,
                    index,
                    failures.len()
                )));
            }
        }

        tracing::debug!(
            "Reindexed {} -> {}: {}",
            self.source,
            index,
            response.get("total").cloned().unwrap_or_default()
        );
        Ok(())
    }
}
