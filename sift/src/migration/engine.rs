use super::generation::{next_generation, physical_name};
use super::report::{MigrationIntent, MigrationOutcome, MigrationReport, Step};
use crate::client::{AdminClient, AliasAction};
use crate::index::IndexDescriptor;
use crate::metrics::{AdminTimer, MigrationTimer};
use crate::Error;
use std::future::Future;
use std::sync::Arc;

/// A step that failed, with the error that stopped the run
struct StepFailure {
    step: Step,
    error: Error,
}

type StepResult<T> = std::result::Result<T, StepFailure>;

/// Await one step's client call, recording its metrics
async fn call<T, F>(step: Step, fut: F) -> StepResult<T>
where
    F: Future<Output = crate::Result<T>>,
{
    let timer = AdminTimer::new(step.as_str());
    let result = fut.await;
    timer.finish(&result);
    result.map_err(|error| StepFailure { step, error })
}

/// Drives create / update / recreate against one administration client
pub struct Migrator {
    client: Arc<dyn AdminClient>,
}

impl Migrator {
    pub fn new(client: Arc<dyn AdminClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn AdminClient> {
        &self.client
    }

    /// Run one migration to completion.
    ///
    /// Client failures end up in the report's outcome; this never returns an
    /// error and never rolls back completed steps.
    pub async fn run(
        &self,
        descriptor: &IndexDescriptor,
        intent: MigrationIntent,
        run_backfill: bool,
    ) -> MigrationReport {
        let timer = MigrationTimer::new(intent.as_str());
        let mut report = MigrationReport::new(descriptor.name(), intent);

        tracing::info!("Starting {} of index '{}'", intent, descriptor.name());

        let result = match intent {
            MigrationIntent::Create => self.create(descriptor, run_backfill, &mut report).await,
            MigrationIntent::Update => self.update(descriptor, &mut report).await,
            MigrationIntent::Recreate => {
                self.recreate(descriptor, run_backfill, &mut report).await
            }
        };

        report.outcome = match result {
            Ok(outcome) => outcome,
            Err(StepFailure { step, error }) => {
                tracing::error!(
                    "{} of '{}' failed at {}: {}",
                    intent,
                    descriptor.name(),
                    step,
                    error
                );
                MigrationOutcome::Failed {
                    step,
                    error: error.to_string(),
                }
            }
        };

        let elapsed = timer.finish(report.outcome.label());
        tracing::info!(
            index = %descriptor.name(),
            outcome = report.outcome.label(),
            duration_ms = elapsed.as_millis() as u64,
            "Migration finished"
        );
        report
    }

    async fn create(
        &self,
        descriptor: &IndexDescriptor,
        run_backfill: bool,
        report: &mut MigrationReport,
    ) -> StepResult<MigrationOutcome> {
        let name = descriptor.name();

        let exists = call(Step::CheckExists, self.client.exists(name)).await?;
        report.steps.push(Step::CheckExists);

        if exists {
            tracing::warn!("Index '{}' already exists, nothing to create", name);
            // Only informs the report; a failed lookup does not change the outcome
            match self.client.get_alias(name).await {
                Ok(current) => {
                    report.steps.push(Step::ResolveAlias);
                    report.previous_index = current.into_keys().next();
                }
                Err(e) => tracing::warn!("Alias lookup for '{}' failed: {}", name, e),
            }
            return Ok(MigrationOutcome::Skipped {
                reason: format!("index '{}' already exists", name),
            });
        }

        let physical = physical_name(name, 0);
        call(
            Step::CreateIndex,
            self.client.create(
                &physical,
                descriptor.settings(),
                &descriptor.mappings(),
                &[name.to_string()],
            ),
        )
        .await?;
        report.steps.push(Step::CreateIndex);
        report.physical_index = Some(physical.clone());
        tracing::info!("Index '{}' created with alias '{}'", physical, name);

        self.backfill(descriptor, &physical, run_backfill, report)
            .await?;

        Ok(MigrationOutcome::Completed)
    }

    async fn recreate(
        &self,
        descriptor: &IndexDescriptor,
        run_backfill: bool,
        report: &mut MigrationReport,
    ) -> StepResult<MigrationOutcome> {
        let name = descriptor.name();

        let exists = call(Step::CheckExists, self.client.exists(name)).await?;
        report.steps.push(Step::CheckExists);

        let current = if exists {
            let targets = call(Step::ResolveAlias, self.client.get_alias(name)).await?;
            let mut targets = targets.into_keys();
            let current = match (targets.next(), targets.next()) {
                (Some(only), None) => only,
                (None, _) => {
                    return Err(StepFailure {
                        step: Step::ResolveAlias,
                        error: Error::InvalidAlias(format!(
                            "'{}' exists but is not an alias",
                            name
                        )),
                    })
                }
                (Some(_), Some(_)) => {
                    return Err(StepFailure {
                        step: Step::ResolveAlias,
                        error: Error::InvalidAlias(format!(
                            "'{}' points to more than one index",
                            name
                        )),
                    })
                }
            };
            report.steps.push(Step::ResolveAlias);
            report.previous_index = Some(current.clone());
            Some(current)
        } else {
            None
        };

        let physical = call(
            Step::NextGeneration,
            next_generation(self.client.as_ref(), name, current.as_deref()),
        )
        .await?;
        report.steps.push(Step::NextGeneration);

        call(
            Step::CreateIndex,
            self.client.create(
                &physical,
                descriptor.settings(),
                &descriptor.mappings(),
                &[],
            ),
        )
        .await?;
        report.steps.push(Step::CreateIndex);
        report.physical_index = Some(physical.clone());
        tracing::info!("Index '{}' created", physical);

        self.backfill(descriptor, &physical, run_backfill, report)
            .await?;

        match &current {
            Some(old) => {
                let actions = [
                    AliasAction::add(physical.as_str(), name),
                    AliasAction::remove(old.as_str(), name),
                ];
                call(Step::RepointAlias, self.client.update_aliases(&actions)).await?;
                tracing::info!("Alias '{}' moved from '{}' to '{}'", name, old, physical);
            }
            None => {
                call(Step::RepointAlias, self.client.put_alias(&physical, name)).await?;
                tracing::info!("Alias '{}' attached to '{}'", name, physical);
            }
        }
        report.steps.push(Step::RepointAlias);

        if let Some(old) = &current {
            call(Step::DeleteOld, self.client.delete(old)).await?;
            report.steps.push(Step::DeleteOld);
            tracing::warn!("Index '{}' deleted", old);
        }

        Ok(MigrationOutcome::Completed)
    }

    async fn update(
        &self,
        descriptor: &IndexDescriptor,
        report: &mut MigrationReport,
    ) -> StepResult<MigrationOutcome> {
        let name = descriptor.name();

        let exists = call(Step::CheckExists, self.client.exists(name)).await?;
        report.steps.push(Step::CheckExists);
        if !exists {
            tracing::warn!("Index '{}' does not exist, nothing to update", name);
            return Ok(MigrationOutcome::Skipped {
                reason: format!("index '{}' does not exist", name),
            });
        }

        tracing::warn!("Closing index '{}'", name);
        let result = self.apply_update(descriptor, report).await;

        // Reopen regardless of how far the update got
        let reopened = call(Step::Open, self.client.open(name)).await;
        if reopened.is_ok() {
            report.steps.push(Step::Open);
            tracing::info!("Index '{}' opened", name);
        }

        match (result, reopened) {
            (Ok(()), Ok(())) => Ok(MigrationOutcome::Completed),
            (Ok(()), Err(failure)) => Err(failure),
            (Err(failure), Ok(())) => Err(failure),
            (Err(failure), Err(cleanup)) => {
                tracing::error!("Reopening '{}' failed: {}", name, cleanup.error);
                report.cleanup_error = Some(cleanup.error.to_string());
                Err(failure)
            }
        }
    }

    async fn apply_update(
        &self,
        descriptor: &IndexDescriptor,
        report: &mut MigrationReport,
    ) -> StepResult<()> {
        let name = descriptor.name();

        call(Step::Close, self.client.close(name)).await?;
        report.steps.push(Step::Close);

        call(
            Step::PutSettings,
            self.client.put_settings(name, descriptor.settings()),
        )
        .await?;
        report.steps.push(Step::PutSettings);
        tracing::info!("Settings of '{}' updated", name);

        call(
            Step::PutMapping,
            self.client.put_mapping(
                name,
                descriptor.doc_type(),
                &descriptor.mapping_update(),
            ),
        )
        .await?;
        report.steps.push(Step::PutMapping);
        tracing::info!("Mapping of '{}' updated", name);

        Ok(())
    }

    async fn backfill(
        &self,
        descriptor: &IndexDescriptor,
        physical: &str,
        run_backfill: bool,
        report: &mut MigrationReport,
    ) -> StepResult<()> {
        let Some(backfill) = descriptor.backfill() else {
            return Ok(());
        };
        if !run_backfill {
            tracing::info!("Skipping data load for '{}'", physical);
            return Ok(());
        }

        tracing::info!("Loading data into '{}'", physical);
        backfill
            .run(physical, self.client.as_ref())
            .await
            .map_err(|error| StepFailure {
                step: Step::Backfill,
                error,
            })?;
        report.steps.push(Step::Backfill);
        tracing::info!("Data loaded into '{}'", physical);
        Ok(())
    }
}
