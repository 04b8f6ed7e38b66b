//! Searchable index handle
//!
//! Wraps a query builder for one index together with the client that
//! executes it. The builder API is reachable through `Deref`; the only
//! operations that talk to the engine are [`SearchIndex::search`],
//! [`SearchIndex::count`] and [`SearchIndex::delete_by_query`].

use crate::client::{execute, AdminClient, Response, Terminal};
use crate::index::IndexDescriptor;
use crate::query::QueryBuilder;
use crate::Result;
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

pub struct SearchIndex {
    client: Arc<dyn AdminClient>,
    query: QueryBuilder,
}

impl SearchIndex {
    pub fn new(client: Arc<dyn AdminClient>, index: impl Into<String>) -> Self {
        Self {
            client,
            query: QueryBuilder::new(index),
        }
    }

    /// Handle on a descriptor's alias, carrying its document type
    pub fn for_descriptor(client: Arc<dyn AdminClient>, descriptor: &IndexDescriptor) -> Self {
        Self {
            client,
            query: descriptor.query(),
        }
    }

    /// Fresh handle on the same index and client with an empty query
    pub fn new_query(&self) -> Self {
        Self {
            client: self.client.clone(),
            query: self.query.new_query(),
        }
    }

    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    pub async fn search(&self) -> Result<Value> {
        execute(self.client.as_ref(), &self.query, Terminal::Search)
            .await
            .map(Response::into_value)
    }

    pub async fn count(&self) -> Result<u64> {
        let response = execute(self.client.as_ref(), &self.query, Terminal::Count).await?;
        Ok(response.count().unwrap_or_default())
    }

    pub async fn delete_by_query(&self) -> Result<Value> {
        execute(self.client.as_ref(), &self.query, Terminal::DeleteByQuery)
            .await
            .map(Response::into_value)
    }

    /// Dispatch by terminal name; anything outside the whitelist is rejected
    pub async fn call(&self, terminal: &str) -> Result<Response> {
        let terminal: Terminal = terminal.parse()?;
        execute(self.client.as_ref(), &self.query, terminal).await
    }
}

impl Deref for SearchIndex {
    type Target = QueryBuilder;

    fn deref(&self) -> &QueryBuilder {
        &self.query
    }
}

impl DerefMut for SearchIndex {
    fn deref_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;
    use crate::Error;

    #[tokio::test]
    async fn test_builder_through_handle() {
        let client = Arc::new(MemoryClient::new());
        client.seed_index("orders_0", 11);
        client.seed_alias("orders_0", "orders");

        let mut orders = SearchIndex::new(client.clone(), "orders");
        orders.where_eq("status", "paid").limit(5);

        assert_eq!(orders.count().await.unwrap(), 11);
        let sent = client.last_request().unwrap();
        assert_eq!(sent.index, "orders");
        assert_eq!(sent.size, Some(5));
    }

    #[tokio::test]
    async fn test_unknown_terminal_rejected() {
        let client = Arc::new(MemoryClient::new());
        let orders = SearchIndex::new(client.clone(), "orders");

        let err = orders.call("update_by_query").await.unwrap_err();
        assert!(matches!(err, Error::InvalidQueryArgument(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_new_query_is_empty() {
        let client = Arc::new(MemoryClient::new());
        let mut orders = SearchIndex::new(client, "orders");
        orders.where_eq("status", "paid");

        let fresh = orders.new_query();
        assert!(fresh.compile().query().is_none());
        assert_eq!(fresh.index_name(), "orders");
    }
}
