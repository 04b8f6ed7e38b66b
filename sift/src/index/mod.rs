//! Index descriptors
//!
//! A descriptor names a logical index and carries everything needed to
//! create a physical generation of it: settings, field mappings and an
//! optional backfill procedure.

mod descriptor;
mod loader;

pub use descriptor::{IndexDefinition, IndexDescriptor, DEFAULT_POOL};
pub use loader::{load_definition, DefinitionLoader};
