//! Fluent query building and zero-downtime index migrations for
//! Elasticsearch-compatible engines.
//!
//! # Querying
//!
//! [`query::QueryBuilder`] accumulates filters, sorting, paging, projection,
//! aggregations, highlighting and collapse directives and compiles them into
//! a single search request whose predicates live in one `bool` query.
//! [`model::SearchIndex`] pairs a builder with a client and exposes the
//! terminal operations `search`, `count` and `delete_by_query`.
//!
//! # Migrations
//!
//! A logical index is an alias over physical generations `{name}_{n}`.
//! [`migration::Migrator`] creates, updates or recreates the generation
//! behind an alias as described by an [`index::IndexDescriptor`].
//!
//! All engine calls go through the [`client::AdminClient`] trait; the
//! `sift-http` crate provides the HTTP implementation.

pub mod client;
pub mod error;
pub mod index;
pub mod metrics;
pub mod migration;
pub mod model;
pub mod query;

pub use client::AdminClient;
pub use error::{Error, Result};
pub use index::IndexDescriptor;
pub use migration::{MigrationIntent, MigrationReport, Migrator};
pub use model::SearchIndex;
pub use query::QueryBuilder;
