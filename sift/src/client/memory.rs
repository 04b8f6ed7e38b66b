//! In-memory administration client
//!
//! Models indices, aliases and open/closed state closely enough to drive the
//! migration engine without a cluster. Every call is recorded, and failures
//! can be injected per operation.

use super::{AdminClient, AliasAction};
use crate::error::{Error, Result};
use crate::query::CompiledSearch;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct MemoryIndex {
    settings: Value,
    mappings: Value,
    open: bool,
    documents: u64,
}

impl MemoryIndex {
    fn new(settings: Value, mappings: Value) -> Self {
        Self {
            settings,
            mappings,
            open: true,
            documents: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    operation: String,
    index: Option<String>,
    reason: String,
}

#[derive(Debug, Default)]
struct State {
    indices: BTreeMap<String, MemoryIndex>,
    /// alias -> physical indices
    aliases: BTreeMap<String, BTreeSet<String>>,
    calls: Vec<String>,
    failures: Vec<Failure>,
    requests: Vec<CompiledSearch>,
}

impl State {
    fn record(&mut self, operation: &str, target: &str) -> Result<()> {
        self.calls.push(format!("{} {}", operation, target));

        let failure = self.failures.iter().find(|f| {
            f.operation == operation && f.index.as_deref().map_or(true, |i| i == target)
        });
        match failure {
            Some(f) => Err(Error::administration(operation, target, f.reason.clone())),
            None => Ok(()),
        }
    }

    /// Concrete indices behind an index or alias name
    fn resolve(&self, operation: &str, name: &str) -> Result<Vec<String>> {
        if self.indices.contains_key(name) {
            return Ok(vec![name.to_string()]);
        }
        match self.aliases.get(name) {
            Some(targets) if !targets.is_empty() => Ok(targets.iter().cloned().collect()),
            _ => Err(not_found(operation, name)),
        }
    }

    fn index_mut(&mut self, operation: &str, name: &str) -> Result<&mut MemoryIndex> {
        self.indices
            .get_mut(name)
            .ok_or_else(|| not_found(operation, name))
    }
}

fn not_found(operation: &str, name: &str) -> Error {
    Error::administration(
        operation,
        name,
        format!("index_not_found_exception: no such index [{}]", name),
    )
}

#[derive(Debug, Default)]
pub struct MemoryClient {
    state: Mutex<State>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an open index holding `documents` documents
    pub fn seed_index(&self, name: &str, documents: u64) {
        let mut state = self.state.lock();
        let mut index = MemoryIndex::new(json!({}), json!({}));
        index.documents = documents;
        state.indices.insert(name.to_string(), index);
    }

    pub fn seed_alias(&self, index: &str, alias: &str) {
        let mut state = self.state.lock();
        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
    }

    /// Make every future `operation` call fail, optionally only for one target
    pub fn fail_on(&self, operation: &str, index: Option<&str>) {
        let mut state = self.state.lock();
        state.failures.push(Failure {
            operation: operation.to_string(),
            index: index.map(str::to_string),
            reason: format!("injected {} failure", operation),
        });
    }

    /// Calls made so far, as `"<operation> <target>"`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.lock().indices.contains_key(name)
    }

    pub fn is_open(&self, name: &str) -> Option<bool> {
        self.state.lock().indices.get(name).map(|i| i.open)
    }

    /// Physical indices an alias points to
    pub fn alias_targets(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .aliases
            .get(alias)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn settings(&self, name: &str) -> Option<Value> {
        self.state.lock().indices.get(name).map(|i| i.settings.clone())
    }

    pub fn mappings(&self, name: &str) -> Option<Value> {
        self.state.lock().indices.get(name).map(|i| i.mappings.clone())
    }

    pub fn document_count(&self, name: &str) -> Option<u64> {
        self.state.lock().indices.get(name).map(|i| i.documents)
    }

    /// Most recent compiled request passed to a terminal operation
    pub fn last_request(&self) -> Option<CompiledSearch> {
        self.state.lock().requests.last().cloned()
    }

    fn apply_create(
        &self,
        index: &str,
        settings: &Value,
        mappings: &Value,
        aliases: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.record("create", index)?;
        if state.indices.contains_key(index) || state.aliases.contains_key(index) {
            return Err(Error::administration(
                "create",
                index,
                format!("resource_already_exists_exception: index [{}] already exists", index),
            ));
        }
        state
            .indices
            .insert(index.to_string(), MemoryIndex::new(settings.clone(), mappings.clone()));
        for alias in aliases {
            state
                .aliases
                .entry(alias.clone())
                .or_default()
                .insert(index.to_string());
        }
        Ok(())
    }

    fn apply_alias_actions(
        &self,
        operation: &str,
        target: &str,
        actions: &[AliasAction],
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.record(operation, target)?;

        // Validate everything first so the update is all-or-nothing
        for action in actions {
            let (AliasAction::Add { index, .. } | AliasAction::Remove { index, .. }) = action;
            if !state.indices.contains_key(index) {
                return Err(not_found(operation, index));
            }
        }

        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    state
                        .aliases
                        .entry(alias.clone())
                        .or_default()
                        .insert(index.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(targets) = state.aliases.get_mut(alias) {
                        targets.remove(index);
                        if targets.is_empty() {
                            state.aliases.remove(alias);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_delete(&self, index: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.record("delete", index)?;
        if state.indices.remove(index).is_none() {
            return Err(not_found("delete", index));
        }
        state.aliases.retain(|_, targets| {
            targets.remove(index);
            !targets.is_empty()
        });
        Ok(())
    }

    fn apply_set_open(&self, operation: &str, name: &str, open: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.record(operation, name)?;
        for index in state.resolve(operation, name)? {
            state.index_mut(operation, &index)?.open = open;
        }
        Ok(())
    }

    fn apply_update<F>(&self, operation: &str, name: &str, update: F) -> Result<()>
    where
        F: Fn(&mut MemoryIndex),
    {
        let mut state = self.state.lock();
        state.record(operation, name)?;
        for index in state.resolve(operation, name)? {
            update(state.index_mut(operation, &index)?);
        }
        Ok(())
    }

    fn apply_request(&self, operation: &str, request: &CompiledSearch) -> Result<u64> {
        let mut state = self.state.lock();
        state.record(operation, &request.index)?;
        state.requests.push(request.clone());

        let mut total = 0;
        for index in state.resolve(operation, &request.index)? {
            let target = state.index_mut(operation, &index)?;
            if !target.open {
                return Err(Error::administration(
                    operation,
                    index,
                    "index_closed_exception: closed",
                ));
            }
            total += target.documents;
        }
        Ok(total)
    }
}

#[async_trait]
impl AdminClient for MemoryClient {
    async fn exists(&self, index: &str) -> Result<bool> {
        let mut state = self.state.lock();
        state.record("exists", index)?;
        Ok(state.indices.contains_key(index) || state.aliases.contains_key(index))
    }

    async fn create(
        &self,
        index: &str,
        settings: &Value,
        mappings: &Value,
        aliases: &[String],
    ) -> Result<()> {
        self.apply_create(index, settings, mappings, aliases)
    }

    async fn get_alias(&self, alias: &str) -> Result<BTreeMap<String, Value>> {
        let mut state = self.state.lock();
        state.record("get_alias", alias)?;
        let found = state
            .aliases
            .get(alias)
            .map(|targets| {
                targets
                    .iter()
                    .map(|t| {
                        let mut aliases = serde_json::Map::new();
                        aliases.insert(alias.to_string(), json!({}));
                        (t.clone(), json!({ "aliases": aliases }))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }

    async fn put_alias(&self, index: &str, alias: &str) -> Result<()> {
        self.apply_alias_actions("put_alias", index, &[AliasAction::add(index, alias)])
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        let target = actions
            .iter()
            .map(|a| match a {
                AliasAction::Add { index, .. } => format!("+{}", index),
                AliasAction::Remove { index, .. } => format!("-{}", index),
            })
            .collect::<Vec<_>>()
            .join(",");
        self.apply_alias_actions("update_aliases", &target, actions)
    }

    async fn delete(&self, index: &str) -> Result<()> {
        self.apply_delete(index)
    }

    async fn close(&self, index: &str) -> Result<()> {
        self.apply_set_open("close", index, false)
    }

    async fn open(&self, index: &str) -> Result<()> {
        self.apply_set_open("open", index, true)
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<()> {
        self.apply_update("put_settings", index, |i| {
            merge_object(&mut i.settings, settings)
        })
    }

    async fn put_mapping(
        &self,
        index: &str,
        _doc_type: Option<&str>,
        mapping: &Value,
    ) -> Result<()> {
        self.apply_update("put_mapping", index, |i| merge_object(&mut i.mappings, mapping))
    }

    async fn search(&self, request: &CompiledSearch) -> Result<Value> {
        let total = self.apply_request("search", request)?;
        Ok(json!({
            "hits": { "total": { "value": total, "relation": "eq" }, "hits": [] }
        }))
    }

    async fn count(&self, request: &CompiledSearch) -> Result<u64> {
        self.apply_request("count", request)
    }

    async fn delete_by_query(&self, request: &CompiledSearch) -> Result<Value> {
        if request.query().is_none() {
            return Err(Error::InvalidQueryArgument("delete_by_query requires a query".into()));
        }
        let total = self.apply_request("delete_by_query", request)?;
        Ok(json!({ "deleted": total }))
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<Value> {
        let mut state = self.state.lock();
        state.record("reindex", dest)?;
        let mut copied = 0;
        for index in state.resolve("reindex", source)? {
            copied += state.index_mut("reindex", &index)?.documents;
        }
        state.index_mut("reindex", dest)?.documents += copied;
        Ok(json!({ "total": copied, "created": copied }))
    }
}

fn merge_object(target: &mut Value, patch: &Value) {
    match (target.as_object_mut(), patch.as_object()) {
        (Some(target), Some(patch)) => {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        _ => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_with_alias() {
        let client = MemoryClient::new();
        client
            .create("orders_0", &json!({}), &json!({}), &["orders".to_string()])
            .await
            .unwrap();

        assert!(client.exists("orders").await.unwrap());
        assert!(client.exists("orders_0").await.unwrap());
        assert_eq!(client.alias_targets("orders"), vec!["orders_0"]);

        let err = client
            .create("orders_0", &json!({}), &json!({}), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already_exists"));
    }

    #[tokio::test]
    async fn test_update_aliases_is_all_or_nothing() {
        let client = MemoryClient::new();
        client.seed_index("orders_1", 0);
        client.seed_alias("orders_1", "orders");

        let result = client
            .update_aliases(&[
                AliasAction::add("orders_1", "archive"),
                AliasAction::add("missing", "orders"),
            ])
            .await;
        assert!(result.is_err());
        assert!(client.alias_targets("archive").is_empty());
    }

    #[tokio::test]
    async fn test_close_through_alias() {
        let client = MemoryClient::new();
        client.seed_index("orders_2", 0);
        client.seed_alias("orders_2", "orders");

        client.close("orders").await.unwrap();
        assert_eq!(client.is_open("orders_2"), Some(false));
        client.open("orders").await.unwrap();
        assert_eq!(client.is_open("orders_2"), Some(true));
    }

    #[tokio::test]
    async fn test_delete_drops_alias() {
        let client = MemoryClient::new();
        client.seed_index("orders_0", 0);
        client.seed_alias("orders_0", "orders");

        client.delete("orders_0").await.unwrap();
        assert!(!client.exists("orders").await.unwrap());
        assert!(client.delete("orders_0").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let client = MemoryClient::new();
        client.seed_index("orders_0", 0);
        client.fail_on("put_settings", Some("orders_0"));

        let err = client
            .put_settings("orders_0", &json!({"number_of_replicas": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Administration { .. }));
        assert_eq!(client.calls(), vec!["put_settings orders_0"]);
    }

    #[tokio::test]
    async fn test_reindex_copies_documents() {
        let client = MemoryClient::new();
        client.seed_index("orders_0", 12);
        client.seed_alias("orders_0", "orders");
        client.seed_index("orders_1", 0);

        client.reindex("orders", "orders_1").await.unwrap();
        assert_eq!(client.document_count("orders_1"), Some(12));
    }
}
