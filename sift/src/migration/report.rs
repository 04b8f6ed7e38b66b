use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// What a migration run should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationIntent {
    /// Create generation 0 with the alias attached
    Create,
    /// Close, push settings and mappings, reopen
    Update,
    /// Blue-green cutover to a new generation
    Recreate,
}

impl MigrationIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationIntent::Create => "create",
            MigrationIntent::Update => "update",
            MigrationIntent::Recreate => "recreate",
        }
    }
}

impl fmt::Display for MigrationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationIntent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(MigrationIntent::Create),
            "update" => Ok(MigrationIntent::Update),
            "recreate" => Ok(MigrationIntent::Recreate),
            other => Err(Error::Config(format!("Unknown migration intent: {}", other))),
        }
    }
}

/// One state of the migration state machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CheckExists,
    ResolveAlias,
    NextGeneration,
    CreateIndex,
    Backfill,
    RepointAlias,
    DeleteOld,
    Close,
    PutSettings,
    PutMapping,
    Open,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::CheckExists => "check_exists",
            Step::ResolveAlias => "resolve_alias",
            Step::NextGeneration => "next_generation",
            Step::CreateIndex => "create_index",
            Step::Backfill => "backfill",
            Step::RepointAlias => "repoint_alias",
            Step::DeleteOld => "delete_old",
            Step::Close => "close",
            Step::PutSettings => "put_settings",
            Step::PutMapping => "put_mapping",
            Step::Open => "open",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Completed,
    Skipped { reason: String },
    Failed { step: Step, error: String },
}

impl MigrationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MigrationOutcome::Completed => "completed",
            MigrationOutcome::Skipped { .. } => "skipped",
            MigrationOutcome::Failed { .. } => "failed",
        }
    }
}

/// Result of one migration run.
///
/// `steps` lists the steps that completed, in order. A failed run leaves the
/// cluster in the state after the last of them; nothing is rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub index: String,
    pub intent: MigrationIntent,
    /// Physical index the alias pointed to before the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_index: Option<String>,
    /// Physical index created by the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_index: Option<String>,
    pub steps: Vec<Step>,
    pub outcome: MigrationOutcome,
    /// Failure of the always-run reopen, when the run already failed earlier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,
}

impl MigrationReport {
    pub fn new(index: impl Into<String>, intent: MigrationIntent) -> Self {
        Self {
            index: index.into(),
            intent,
            previous_index: None,
            physical_index: None,
            steps: Vec::new(),
            outcome: MigrationOutcome::Completed,
            cleanup_error: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == MigrationOutcome::Completed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, MigrationOutcome::Failed { .. })
    }

    /// One-line summary for operators
    pub fn message(&self) -> String {
        let mut message = match &self.outcome {
            MigrationOutcome::Completed => match &self.physical_index {
                Some(physical) => {
                    format!("{} '{}' completed ({})", self.intent, self.index, physical)
                }
                None => format!("{} '{}' completed", self.intent, self.index),
            },
            MigrationOutcome::Skipped { reason } => {
                format!("{} '{}' skipped: {}", self.intent, self.index, reason)
            }
            MigrationOutcome::Failed { step, error } => {
                format!("{} '{}' failed at {}: {}", self.intent, self.index, step, error)
            }
        };
        if let Some(cleanup) = &self.cleanup_error {
            message.push_str(&format!(" (reopen also failed: {})", cleanup));
        }
        message
    }
}
