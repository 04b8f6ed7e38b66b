//! Index migrations
//!
//! Three intents drive a logical index through its physical generations:
//!
//! - **create**: generation 0 with the alias attached, unless the name exists
//! - **update**: close, push settings and mappings, always reopen
//! - **recreate**: new generation, optional backfill, atomic alias cutover,
//!   then the old generation is deleted
//!
//! Failures never panic and never roll back; the [`MigrationReport`] records
//! how far the run got.

mod backfill;
mod engine;
pub mod generation;
mod report;

pub use backfill::{Backfill, ReindexBackfill};
pub use engine::Migrator;
pub use generation::{next_generation, parse_generation, physical_name};
pub use report::{MigrationIntent, MigrationOutcome, MigrationReport, Step};
