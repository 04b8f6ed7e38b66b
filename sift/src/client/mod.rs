//! Administration and search client interface
//!
//! Every engine call made by the migration engine or a terminal query
//! operation goes through [`AdminClient`]. Transport, pooling and timeouts
//! are the implementation's concern.

pub mod memory;

use crate::error::{Error, Result};
use crate::query::{CompiledSearch, QueryBuilder};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use memory::MemoryClient;

/// One action of an atomic alias update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Add {
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }
}

#[async_trait]
pub trait AdminClient: Send + Sync {
    /// True if an index or alias with this name exists
    async fn exists(&self, index: &str) -> Result<bool>;

    /// Create an index, attaching `aliases` in the same call
    async fn create(
        &self,
        index: &str,
        settings: &Value,
        mappings: &Value,
        aliases: &[String],
    ) -> Result<()>;

    /// Physical indices behind an alias, with their alias metadata
    async fn get_alias(&self, alias: &str) -> Result<BTreeMap<String, Value>>;

    async fn put_alias(&self, index: &str, alias: &str) -> Result<()>;

    /// Apply alias actions atomically
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()>;

    async fn delete(&self, index: &str) -> Result<()>;

    async fn close(&self, index: &str) -> Result<()>;

    async fn open(&self, index: &str) -> Result<()>;

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<()>;

    async fn put_mapping(&self, index: &str, doc_type: Option<&str>, mapping: &Value)
        -> Result<()>;

    async fn search(&self, request: &CompiledSearch) -> Result<Value>;

    async fn count(&self, request: &CompiledSearch) -> Result<u64>;

    async fn delete_by_query(&self, request: &CompiledSearch) -> Result<Value>;

    /// Copy every document of `source` into `dest`
    async fn reindex(&self, source: &str, dest: &str) -> Result<Value>;
}

/// Terminal operations a compiled query can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Search,
    Count,
    DeleteByQuery,
}

impl Terminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminal::Search => "search",
            Terminal::Count => "count",
            Terminal::DeleteByQuery => "delete_by_query",
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Terminal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "search" => Ok(Terminal::Search),
            "count" => Ok(Terminal::Count),
            "delete_by_query" | "deleteByQuery" => Ok(Terminal::DeleteByQuery),
            other => Err(Error::InvalidQueryArgument(format!(
                "Unsupported terminal operation: {}",
                other
            ))),
        }
    }
}

/// What a terminal operation returned
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Search(Value),
    Count(u64),
    DeleteByQuery(Value),
}

impl Response {
    pub fn count(&self) -> Option<u64> {
        match self {
            Response::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Response::Search(v) | Response::DeleteByQuery(v) => v,
            Response::Count(n) => Value::from(n),
        }
    }
}

/// Compile `query` and dispatch it. Count requests never carry `_source`.
pub async fn execute(
    client: &dyn AdminClient,
    query: &QueryBuilder,
    terminal: Terminal,
) -> Result<Response> {
    let compiled = query.compile();
    tracing::debug!(index = %compiled.index, operation = %terminal, "dispatching query");

    match terminal {
        Terminal::Search => client.search(&compiled).await.map(Response::Search),
        Terminal::Count => client
            .count(&compiled.without_source())
            .await
            .map(Response::Count),
        Terminal::DeleteByQuery => client
            .delete_by_query(&compiled)
            .await
            .map(Response::DeleteByQuery),
    }
}
