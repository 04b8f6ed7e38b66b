//! reqwest implementation of [`AdminClient`]

use crate::config::PoolConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::{json, Map, Value};
use sift::client::{AdminClient, AliasAction};
use sift::query::CompiledSearch;
use sift::{Error, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// HTTP client for one connection pool
///
/// Requests rotate over the pool's hosts. Connection reuse, idle limits and
/// timeouts are handled by the underlying `reqwest::Client`.
pub struct HttpClient {
    pool: String,
    http: reqwest::Client,
    hosts: Vec<Url>,
    next_host: AtomicUsize,
    username: Option<String>,
    password: Option<String>,
}

impl HttpClient {
    pub fn new(pool: &str, config: &PoolConfig) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(Error::ConfigurationMissing(format!("pools.{}.hosts", pool)));
        }

        let hosts = config
            .hosts
            .iter()
            .map(|h| {
                Url::parse(h)
                    .map_err(|e| Error::Config(format!("invalid host '{}': {}", h, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_connections)
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!("Created HTTP client for pool '{}' ({} hosts)", pool, hosts.len());

        Ok(Self {
            pool: pool.to_string(),
            http,
            hosts,
            next_host: AtomicUsize::new(0),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub fn hosts(&self) -> &[Url] {
        &self.hosts
    }

    fn next_base(&self) -> &Url {
        let i = self.next_host.fetch_add(1, Ordering::Relaxed);
        &self.hosts[i % self.hosts.len()]
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = endpoint(self.next_base(), segments)?;
        let mut builder = self.http.request(method, url);
        if let Some(user) = &self.username {
            builder = builder.basic_auth(user, self.password.as_ref());
        }
        Ok(builder)
    }

    async fn send(
        &self,
        operation: &str,
        index: &str,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::administration(operation, index, e.to_string()))?;

        let status = response.status();
        tracing::debug!("{} {} -> {}", operation, index, status);

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::administration(
            operation,
            index,
            format!("{}: {}", status, body),
        ))
    }

    async fn send_json(
        &self,
        operation: &str,
        index: &str,
        builder: RequestBuilder,
    ) -> Result<Value> {
        let response = self.send(operation, index, builder).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::administration(operation, index, e.to_string()))
    }
}

/// `base` with `segments` appended as percent-encoded path segments
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("host '{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Body of an index creation request
pub fn create_body(settings: &Value, mappings: &Value, aliases: &[String]) -> Value {
    let mut body = Map::new();
    if !is_empty_object(settings) {
        body.insert("settings".to_string(), settings.clone());
    }
    if !is_empty_object(mappings) {
        body.insert("mappings".to_string(), mappings.clone());
    }
    if !aliases.is_empty() {
        let aliases: Map<String, Value> = aliases
            .iter()
            .map(|a| (a.clone(), json!({})))
            .collect();
        body.insert("aliases".to_string(), Value::Object(aliases));
    }
    Value::Object(body)
}

/// Search body: compiled body plus paging and projection
pub fn search_body(request: &CompiledSearch) -> Result<Value> {
    let mut body = match &request.body {
        Some(b) => serde_json::to_value(b)?,
        None => json!({}),
    };
    if let Some(obj) = body.as_object_mut() {
        if let Some(from) = request.from {
            obj.insert("from".to_string(), json!(from));
        }
        if let Some(size) = request.size {
            obj.insert("size".to_string(), json!(size));
        }
        if let Some(source) = &request.source {
            obj.insert("_source".to_string(), serde_json::to_value(source)?);
        }
    }
    Ok(body)
}

/// Count and delete-by-query accept only the query
pub fn query_only_body(request: &CompiledSearch) -> Result<Value> {
    match request.query() {
        Some(bool_query) => Ok(json!({ "query": { "bool": serde_json::to_value(bool_query)? } })),
        None => Ok(json!({})),
    }
}

pub fn reindex_body(source: &str, dest: &str) -> Value {
    json!({
        "source": { "index": source },
        "dest": { "index": dest }
    })
}

fn is_empty_object(v: &Value) -> bool {
    v.is_null() || v.as_object().is_some_and(|o| o.is_empty())
}

/// Path segments for a search-style endpoint, with the optional type
fn typed_path<'a>(request: &'a CompiledSearch, endpoint: &'a str) -> Vec<&'a str> {
    let mut segments = vec![request.index.as_str()];
    if let Some(t) = &request.doc_type {
        segments.push(t.as_str());
    }
    segments.push(endpoint);
    segments
}

#[async_trait]
impl AdminClient for HttpClient {
    async fn exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, &[index])?
            .send()
            .await
            .map_err(|e| Error::administration("exists", index, e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::administration("exists", index, status.to_string())),
        }
    }

    async fn create(
        &self,
        index: &str,
        settings: &Value,
        mappings: &Value,
        aliases: &[String],
    ) -> Result<()> {
        let body = create_body(settings, mappings, aliases);
        let builder = self.request(Method::PUT, &[index])?.json(&body);
        self.send("create", index, builder).await?;
        Ok(())
    }

    async fn get_alias(&self, alias: &str) -> Result<BTreeMap<String, Value>> {
        let response = self
            .request(Method::GET, &["_alias", alias])?
            .send()
            .await
            .map_err(|e| Error::administration("get_alias", alias, e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(BTreeMap::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::administration(
                "get_alias",
                alias,
                format!("{}: {}", status, body),
            ));
        }

        let body: BTreeMap<String, Value> = response
            .json()
            .await
            .map_err(|e| Error::administration("get_alias", alias, e.to_string()))?;
        Ok(body)
    }

    async fn put_alias(&self, index: &str, alias: &str) -> Result<()> {
        let builder = self.request(Method::PUT, &[index, "_alias", alias])?;
        self.send("put_alias", index, builder).await?;
        Ok(())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        let builder = self
            .request(Method::POST, &["_aliases"])?
            .json(&json!({ "actions": actions }));
        self.send("update_aliases", "_aliases", builder).await?;
        Ok(())
    }

    async fn delete(&self, index: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &[index])?;
        self.send("delete", index, builder).await?;
        Ok(())
    }

    async fn close(&self, index: &str) -> Result<()> {
        let builder = self.request(Method::POST, &[index, "_close"])?;
        self.send("close", index, builder).await?;
        Ok(())
    }

    async fn open(&self, index: &str) -> Result<()> {
        let builder = self.request(Method::POST, &[index, "_open"])?;
        self.send("open", index, builder).await?;
        Ok(())
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<()> {
        let builder = self
            .request(Method::PUT, &[index, "_settings"])?
            .json(settings);
        self.send("put_settings", index, builder).await?;
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        doc_type: Option<&str>,
        mapping: &Value,
    ) -> Result<()> {
        let mut segments = vec![index, "_mapping"];
        if let Some(t) = doc_type {
            segments.push(t);
        }
        let builder = self.request(Method::PUT, &segments)?.json(mapping);
        self.send("put_mapping", index, builder).await?;
        Ok(())
    }

    async fn search(&self, request: &CompiledSearch) -> Result<Value> {
        let body = search_body(request)?;
        let builder = self
            .request(Method::POST, &typed_path(request, "_search"))?
            .json(&body);
        self.send_json("search", &request.index, builder).await
    }

    async fn count(&self, request: &CompiledSearch) -> Result<u64> {
        let body = query_only_body(request)?;
        let builder = self
            .request(Method::POST, &typed_path(request, "_count"))?
            .json(&body);
        let response = self.send_json("count", &request.index, builder).await?;
        response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::administration("count", &request.index, "response has no count"))
    }

    async fn delete_by_query(&self, request: &CompiledSearch) -> Result<Value> {
        if request.query().is_none() {
            return Err(Error::InvalidQueryArgument("delete_by_query requires a query".into()));
        }
        let body = query_only_body(request)?;
        let builder = self
            .request(Method::POST, &[request.index.as_str(), "_delete_by_query"])?
            .json(&body);
        self.send_json("delete_by_query", &request.index, builder)
            .await
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<Value> {
        let builder = self
            .request(Method::POST, &["_reindex"])?
            .query(&[("wait_for_completion", "true")])
            .json(&reindex_body(source, dest));
        self.send_json("reindex", dest, builder).await
    }
}
