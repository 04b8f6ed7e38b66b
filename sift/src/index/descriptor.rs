use crate::migration::Backfill;
use crate::query::QueryBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_POOL: &str = "default";

/// Declarative description of one logical index
///
/// The name is the public alias; physical indices are generations of it.
#[derive(Clone)]
pub struct IndexDescriptor {
    name: String,
    doc_type: Option<String>,
    pool: String,
    settings: Value,
    properties: Map<String, Value>,
    backfill: Option<Arc<dyn Backfill>>,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc_type: None,
            pool: DEFAULT_POOL.to_string(),
            settings: json!({}),
            properties: Map::new(),
            backfill: None,
        }
    }

    pub fn with_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = pool.into();
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Add or replace one field mapping
    pub fn with_property(mut self, field: impl Into<String>, mapping: Value) -> Self {
        self.properties.insert(field.into(), mapping);
        self
    }

    pub fn with_backfill(mut self, backfill: Arc<dyn Backfill>) -> Self {
        self.backfill = Some(backfill);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub fn settings(&self) -> &Value {
        &self.settings
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn backfill(&self) -> Option<&Arc<dyn Backfill>> {
        self.backfill.as_ref()
    }

    /// Mapping body for index creation.
    ///
    /// Typed engines get `{type: {properties}}`, typeless ones `{properties}`.
    pub fn mappings(&self) -> Value {
        let body = self.mapping_update();
        match &self.doc_type {
            Some(t) => {
                let mut typed = Map::new();
                typed.insert(t.clone(), body);
                Value::Object(typed)
            }
            None => body,
        }
    }

    /// Mapping body for a put-mapping call, which carries the type in the path
    pub fn mapping_update(&self) -> Value {
        json!({ "properties": Value::Object(self.properties.clone()) })
    }

    /// Fresh query builder aimed at this index's alias
    pub fn query(&self) -> QueryBuilder {
        let mut builder = QueryBuilder::new(self.name.clone());
        if let Some(t) = &self.doc_type {
            builder.doc_type(t.clone());
        }
        builder
    }
}

impl fmt::Debug for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDescriptor")
            .field("name", &self.name)
            .field("doc_type", &self.doc_type)
            .field("pool", &self.pool)
            .field("settings", &self.settings)
            .field("properties", &self.properties)
            .field("backfill", &self.backfill.is_some())
            .finish()
    }
}

/// Index definition as written in a YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub index: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    #[serde(default = "default_pool")]
    pub pool: String,

    #[serde(default = "default_settings")]
    pub settings: Value,

    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn default_pool() -> String {
    DEFAULT_POOL.to_string()
}

fn default_settings() -> Value {
    json!({})
}

impl From<IndexDefinition> for IndexDescriptor {
    fn from(def: IndexDefinition) -> Self {
        let mut descriptor = IndexDescriptor::new(def.index)
            .with_pool(def.pool)
            .with_settings(def.settings)
            .with_properties(def.properties);
        if let Some(t) = def.doc_type {
            descriptor = descriptor.with_type(t);
        }
        descriptor
    }
}
