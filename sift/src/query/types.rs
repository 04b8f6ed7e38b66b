//! Search document model
//!
//! The clause vocabulary the builder emits and the shape of a compiled search
//! request. Everything here serializes to the engine's Query DSL.

use crate::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One predicate of a bool query
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Exact value match (not analyzed)
    Term(BTreeMap<String, Value>),

    /// Any of several exact values
    Terms(BTreeMap<String, Vec<Value>>),

    /// Analyzed full-text match
    Match(BTreeMap<String, Value>),

    /// Analyzed phrase match
    MatchPhrase(BTreeMap<String, Value>),

    /// Full-text match across several fields
    MultiMatch(MultiMatchQuery),

    /// Bounded range
    Range(BTreeMap<String, RangeParams>),

    /// Field has a value
    Exists(ExistsQuery),

    /// Nested clause group
    Bool(BoolQuery),
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Term(single(field, value.into()))
    }

    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Clause::Terms(single(field, values.into_iter().map(Into::into).collect()))
    }

    pub fn matches(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Match(single(field, value.into()))
    }

    pub fn match_phrase(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::MatchPhrase(single(field, value.into()))
    }

    /// Build a multi_match clause. `query` and `fields` always win over
    /// same-named keys in `options`.
    pub fn multi_match<I, S>(
        fields: I,
        query: impl Into<Value>,
        mut options: Map<String, Value>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        options.remove("query");
        options.remove("fields");
        Clause::MultiMatch(MultiMatchQuery {
            query: query.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            options,
        })
    }

    pub fn range(field: impl Into<String>, params: RangeParams) -> Self {
        Clause::Range(single(field, params))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Clause::Exists(ExistsQuery {
            field: field.into(),
        })
    }

    /// Get the DSL name of this clause
    pub fn kind(&self) -> &'static str {
        match self {
            Clause::Term(_) => "term",
            Clause::Terms(_) => "terms",
            Clause::Match(_) => "match",
            Clause::MatchPhrase(_) => "match_phrase",
            Clause::MultiMatch(_) => "multi_match",
            Clause::Range(_) => "range",
            Clause::Exists(_) => "exists",
            Clause::Bool(_) => "bool",
        }
    }
}

fn single<T>(field: impl Into<String>, value: T) -> BTreeMap<String, T> {
    let mut map = BTreeMap::new();
    map.insert(field.into(), value);
    map
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MultiMatchQuery {
    pub query: Value,
    pub fields: Vec<String>,
    /// Extra options such as `type`, `operator` or `analyzer`
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RangeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl RangeParams {
    /// Single-bound range for one comparison operator
    pub fn bound(op: RangeOp, value: impl Into<Value>) -> Self {
        let value = Some(value.into());
        match op {
            RangeOp::Gt => Self {
                gt: value,
                ..Default::default()
            },
            RangeOp::Gte => Self {
                gte: value,
                ..Default::default()
            },
            RangeOp::Lt => Self {
                lt: value,
                ..Default::default()
            },
            RangeOp::Lte => Self {
                lte: value,
                ..Default::default()
            },
        }
    }

    /// Inclusive range on both ends
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            gte: Some(low.into()),
            lte: Some(high.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExistsQuery {
    pub field: String,
}

/// Clause sequence of a bool query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Occur {
    /// AND, non-scoring
    #[default]
    Filter,
    /// AND, scoring
    Must,
    /// OR
    Should,
    /// NOT
    MustNot,
}

impl Occur {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occur::Filter => "filter",
            Occur::Must => "must",
            Occur::Should => "should",
            Occur::MustNot => "must_not",
        }
    }
}

impl fmt::Display for Occur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Occur {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "filter" => Ok(Occur::Filter),
            "must" => Ok(Occur::Must),
            "should" => Ok(Occur::Should),
            "must_not" => Ok(Occur::MustNot),
            other => Err(Error::InvalidQueryArgument(format!(
                "Invalid where type: {}.",
                other
            ))),
        }
    }
}

/// Range comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FromStr for RangeOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(RangeOp::Gt),
            ">=" => Ok(RangeOp::Gte),
            "<" => Ok(RangeOp::Lt),
            "<=" => Ok(RangeOp::Lte),
            other => Err(Error::InvalidQueryArgument(format!(
                "Invalid operator: {}.",
                other
            ))),
        }
    }
}

/// Comparison operator accepted by `where_op`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Range(RangeOp),
    NotEq,
    Match,
    NotMatch,
    Like,
    NotLike,
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "=" => Ok(Operator::Eq),
            ">" | ">=" | "<" | "<=" => normalized.parse().map(Operator::Range),
            "!=" | "<>" => Ok(Operator::NotEq),
            "match" => Ok(Operator::Match),
            "not match" | "notmatch" => Ok(Operator::NotMatch),
            "like" => Ok(Operator::Like),
            "not like" | "notlike" => Ok(Operator::NotLike),
            _ => Err(Error::InvalidQueryArgument(format!(
                "Invalid operator: {}.",
                s
            ))),
        }
    }
}

/// Four ordered clause sequences
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Clause>,
}

impl BoolQuery {
    pub fn push(&mut self, occur: Occur, clause: Clause) {
        self.sequence_mut(occur).push(clause);
    }

    pub fn sequence(&self, occur: Occur) -> &[Clause] {
        match occur {
            Occur::Filter => &self.filter,
            Occur::Must => &self.must,
            Occur::Should => &self.should,
            Occur::MustNot => &self.must_not,
        }
    }

    fn sequence_mut(&mut self, occur: Occur) -> &mut Vec<Clause> {
        match occur {
            Occur::Filter => &mut self.filter,
            Occur::Must => &mut self.must,
            Occur::Should => &mut self.should,
            Occur::MustNot => &mut self.must_not,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
            && self.should.is_empty()
            && self.must.is_empty()
            && self.must_not.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` (any case) sorts descending
    pub fn normalize(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

/// Single-field sort, serialized as `{"field": "asc"}`
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
}

impl SortClause {
    pub fn new(field: impl Into<String>, direction: &str) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::normalize(direction),
        }
    }
}

impl Serialize for SortClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.order)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceFilter {
    Fields(Vec<String>),
    Object {
        includes: Vec<String>,
        excludes: Vec<String>,
    },
}

impl SourceFilter {
    /// No stored fields, metadata only
    pub fn none() -> Self {
        SourceFilter::Object {
            includes: vec![],
            excludes: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collapse {
    pub field: String,
    pub inner_hits: Map<String, Value>,
    pub max_concurrent_group_searches: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub fields: BTreeMap<String, HighlightField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightField {
    pub pre_tags: Vec<String>,
    pub post_tags: Vec<String>,
}

/// Server-side computed field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptField {
    pub script: Script,
    pub ignore_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub source: String,
    pub lang: String,
}

impl ScriptField {
    /// Painless script exporting the doc value of `field`
    pub fn doc_value(field: &str) -> Self {
        Self {
            script: Script {
                source: format!("doc['{}'].value", field),
                lang: "painless".to_string(),
            },
            ignore_failure: false,
        }
    }
}

/// Named aggregation, serialized as `{"cardinality": {"field": "user_id"}}`
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub kind: String,
    pub field: String,
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut inner = BTreeMap::new();
        inner.insert("field", &self.field);
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.kind, &inner)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryBody {
    pub bool: BoolQuery,
}

/// Request body of a compiled search
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse: Option<Collapse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub script_fields: BTreeMap<String, ScriptField>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, Aggregation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Value>,
}

impl SearchBody {
    pub fn is_empty(&self) -> bool {
        self.sort.is_empty()
            && self.query.is_none()
            && self.collapse.is_none()
            && self.highlight.is_none()
            && self.script_fields.is_empty()
            && self.aggs.is_empty()
            && self.script.is_none()
    }
}

/// Dispatch-ready search parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSearch {
    pub index: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<SearchBody>,
}

impl CompiledSearch {
    /// Drop the projection; count requests carry no documents
    pub fn without_source(mut self) -> Self {
        self.source = None;
        self
    }

    /// The bool query, if any predicate was compiled
    pub fn query(&self) -> Option<&BoolQuery> {
        self.body
            .as_ref()
            .and_then(|b| b.query.as_ref())
            .map(|q| &q.bool)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
