//! Fluent query builder
//!
//! Accumulates selection, filtering, sorting, pagination, aggregation,
//! highlighting, field aliasing and collapse directives, then compiles them
//! into one [`CompiledSearch`].
//!
//! ```
//! use sift::query::QueryBuilder;
//!
//! let mut query = QueryBuilder::new("orders");
//! query
//!     .where_eq("status", "paid")
//!     .where_op("total", ">=", 100)?
//!     .order_by("created_at", "desc")
//!     .for_page(2, 20);
//!
//! let compiled = query.compile();
//! assert_eq!(compiled.from, Some(20));
//! # Ok::<(), sift::Error>(())
//! ```

use crate::error::Result;
use crate::query::types::*;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Default collapse group size and parallelism
const DEFAULT_INNER_HITS_SIZE: u64 = 5;
const DEFAULT_MAX_CONCURRENT_GROUP_SEARCHES: u32 = 5;

/// Splits `"field as alias"` in a select list
static ALIAS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+as\s+").expect("static alias pattern"));

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    index: String,
    doc_type: Option<String>,
    wheres: BoolQuery,
    sort: Vec<SortClause>,
    from: Option<u64>,
    size: Option<u64>,
    source: Option<Vec<String>>,
    aggs: BTreeMap<String, Aggregation>,
    collapse: Option<Collapse>,
    highlight_fields: BTreeMap<String, HighlightField>,
    script_fields: BTreeMap<String, ScriptField>,
    script: Option<Value>,
}

impl QueryBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    /// Fresh builder on the same index, sharing nothing else
    pub fn new_query(&self) -> Self {
        Self::new(self.index.clone())
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn index(&mut self, name: impl Into<String>) -> &mut Self {
        self.index = name.into();
        self
    }

    pub fn doc_type(&mut self, label: impl Into<String>) -> &mut Self {
        self.doc_type = Some(label.into());
        self
    }

    // ---------------------------------------------------------------
    // Projection
    // ---------------------------------------------------------------

    /// Set the fields to fetch. Entries may carry an alias: `"price as cost"`.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn add_select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source
            .get_or_insert_with(Vec::new)
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Export `column` under `alias` through a script field
    pub fn add_alias(&mut self, column: &str, alias: &str) -> &mut Self {
        self.add_script_field(column, alias)
    }

    pub fn add_script_field(&mut self, column: &str, alias: &str) -> &mut Self {
        if !column.is_empty() && !alias.is_empty() {
            self.script_fields
                .insert(alias.to_string(), ScriptField::doc_value(column));
        }
        self
    }

    // ---------------------------------------------------------------
    // Sorting and paging
    // ---------------------------------------------------------------

    pub fn add_order(&mut self, clauses: Vec<SortClause>, prepend: bool) -> &mut Self {
        if prepend {
            let mut sort = clauses;
            sort.append(&mut self.sort);
            self.sort = sort;
        } else {
            self.sort.extend(clauses);
        }
        self
    }

    /// Sort on one field. Any direction other than `asc` sorts descending.
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.add_order(vec![SortClause::new(column, direction)], false)
    }

    /// Like [`order_by`](Self::order_by) but ahead of existing sorts
    pub fn order_by_prepend(&mut self, column: &str, direction: &str) -> &mut Self {
        self.add_order(vec![SortClause::new(column, direction)], true)
    }

    /// Negative values are ignored
    pub fn offset(&mut self, value: i64) -> &mut Self {
        if value >= 0 {
            self.from = Some(value as u64);
        }
        self
    }

    pub fn skip(&mut self, value: i64) -> &mut Self {
        self.offset(value)
    }

    /// Negative values are ignored
    pub fn limit(&mut self, value: i64) -> &mut Self {
        if value >= 0 {
            self.size = Some(value as u64);
        }
        self
    }

    pub fn take(&mut self, value: i64) -> &mut Self {
        self.limit(value)
    }

    /// One-based page
    pub fn for_page(&mut self, page: i64, per_page: i64) -> &mut Self {
        self.skip(page.saturating_sub(1).saturating_mul(per_page)).take(per_page)
    }

    // ---------------------------------------------------------------
    // Collapse, highlight, aggregations, script
    // ---------------------------------------------------------------

    /// Collapse hits on `column`, keeping the five newest per group
    pub fn collapse(&mut self, column: &str) -> &mut Self {
        self.collapse_with(column, Map::new(), DEFAULT_MAX_CONCURRENT_GROUP_SEARCHES)
    }

    /// Collapse with inner-hits overrides merged over the defaults
    pub fn collapse_with(
        &mut self,
        column: &str,
        inner_hits: Map<String, Value>,
        max_concurrent_group_searches: u32,
    ) -> &mut Self {
        let mut merged = default_inner_hits();
        merged.extend(inner_hits);

        self.collapse = Some(Collapse {
            field: column.to_string(),
            inner_hits: merged,
            max_concurrent_group_searches,
        });
        self
    }

    pub fn highlight(&mut self, column: &str) -> &mut Self {
        self.highlight_with(column, "<em>", "</em>")
    }

    pub fn highlight_with(&mut self, column: &str, pre_tag: &str, post_tag: &str) -> &mut Self {
        self.highlight_fields.insert(
            column.to_string(),
            HighlightField {
                pre_tags: vec![pre_tag.to_string()],
                post_tags: vec![post_tag.to_string()],
            },
        );
        self
    }

    /// Cardinality aggregation named after the field
    pub fn aggregation(&mut self, column: &str) -> &mut Self {
        self.aggregation_with(column, "cardinality", None)
    }

    pub fn aggregation_with(&mut self, column: &str, kind: &str, alias: Option<&str>) -> &mut Self {
        let name = alias.filter(|a| !a.is_empty()).unwrap_or(column);
        self.aggs.insert(
            name.to_string(),
            Aggregation {
                kind: kind.to_string(),
                field: column.to_string(),
            },
        );
        self
    }

    pub fn script(&mut self, payload: Value) -> &mut Self {
        self.script = Some(payload);
        self
    }

    // ---------------------------------------------------------------
    // Clauses
    // ---------------------------------------------------------------

    /// Add a raw clause to a sequence given by name
    pub fn add_where(&mut self, clause: Clause, occur: &str) -> Result<&mut Self> {
        let occur = occur.parse::<Occur>()?;
        Ok(self.add_clause(clause, occur))
    }

    pub fn add_clause(&mut self, clause: Clause, occur: Occur) -> &mut Self {
        self.wheres.push(occur, clause);
        self
    }

    pub fn where_term(&mut self, column: &str, value: impl Into<Value>, occur: Occur) -> &mut Self {
        self.add_clause(Clause::term(column, value), occur)
    }

    pub fn where_terms<I, V>(&mut self, column: &str, values: I, occur: Occur) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_clause(Clause::terms(column, values), occur)
    }

    pub fn where_match(
        &mut self,
        column: &str,
        value: impl Into<Value>,
        occur: Occur,
    ) -> &mut Self {
        self.add_clause(Clause::matches(column, value), occur)
    }

    pub fn where_match_phrase(
        &mut self,
        column: &str,
        value: impl Into<Value>,
        occur: Occur,
    ) -> &mut Self {
        self.add_clause(Clause::match_phrase(column, value), occur)
    }

    pub fn where_multi_match<I, S>(
        &mut self,
        columns: I,
        value: impl Into<Value>,
        options: Map<String, Value>,
        occur: Occur,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_clause(Clause::multi_match(columns, value, options), occur)
    }

    /// Range clause from a comparison operator (`>`, `<`, `>=`, `<=`)
    pub fn where_range(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
        occur: Occur,
    ) -> Result<&mut Self> {
        let op = operator.parse::<RangeOp>()?;
        Ok(self.add_clause(Clause::range(column, RangeParams::bound(op, value)), occur))
    }

    /// Inclusive range on both bounds
    pub fn where_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.add_clause(
            Clause::range(column, RangeParams::between(low, high)),
            Occur::Filter,
        )
    }

    pub fn where_not_between(
        &mut self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.add_clause(
            Clause::range(column, RangeParams::between(low, high)),
            Occur::MustNot,
        )
    }

    pub fn where_exists(&mut self, column: &str) -> &mut Self {
        self.add_clause(Clause::exists(column), Occur::Filter)
    }

    pub fn where_not_exists(&mut self, column: &str) -> &mut Self {
        self.add_clause(Clause::exists(column), Occur::MustNot)
    }

    pub fn where_null(&mut self, column: &str) -> &mut Self {
        self.where_not_exists(column)
    }

    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_terms(column, values, Occur::Filter)
    }

    pub fn or_where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_terms(column, values, Occur::Should)
    }

    pub fn where_not_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_terms(column, values, Occur::MustNot)
    }

    // ---------------------------------------------------------------
    // where / or_where dispatch
    // ---------------------------------------------------------------

    /// Equality filter; same as `where_op(column, "=", value)`
    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.where_clause(column, Operator::Eq, value, Occur::Filter)
    }

    /// Comparison filter with a textual operator
    pub fn where_op(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let op = operator.parse::<Operator>()?;
        Ok(self.where_clause(column, op, value, Occur::Filter))
    }

    pub fn or_where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.where_clause(column, Operator::Eq, value, Occur::Should)
    }

    pub fn or_where_op(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let op = operator.parse::<Operator>()?;
        Ok(self.where_clause(column, op, value, Occur::Should))
    }

    /// Typed dispatch. Negated operators always land in `must_not`.
    pub fn where_clause(
        &mut self,
        column: &str,
        operator: Operator,
        value: impl Into<Value>,
        occur: Occur,
    ) -> &mut Self {
        let value = value.into();
        match operator {
            Operator::Eq => self.where_term(column, value, occur),
            Operator::Range(op) => {
                self.add_clause(Clause::range(column, RangeParams::bound(op, value)), occur)
            }
            Operator::NotEq => self.where_term(column, value, Occur::MustNot),
            Operator::Match => self.where_match(column, value, occur),
            Operator::NotMatch => self.where_match(column, value, Occur::MustNot),
            Operator::Like => self.where_match_phrase(column, value, occur),
            Operator::NotLike => self.where_match_phrase(column, value, Occur::MustNot),
        }
    }

    /// Equality terms that must all match, grouped into one nested bool
    pub fn where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.where_map_in(Occur::Filter, pairs)
    }

    /// Equality terms of which at least one must match. The group itself is
    /// a required filter; only its members are alternatives.
    pub fn or_where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.where_map_in(Occur::Should, pairs)
    }

    fn where_map_in<I, K, V>(&mut self, occur: Occur, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.where_nested_in(Occur::Filter, |query| {
            for (column, value) in pairs {
                query.where_clause(column.as_ref(), Operator::Eq, value, occur);
            }
        })
    }

    pub fn where_nested<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.where_nested_in(Occur::Filter, callback)
    }

    pub fn or_where_nested<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.where_nested_in(Occur::Should, callback)
    }

    /// Run `callback` on a fresh builder and add its clauses as one bool
    /// clause. An empty nested builder adds nothing.
    pub fn where_nested_in<F>(&mut self, occur: Occur, callback: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        let mut query = self.new_query();
        callback(&mut query);
        self.add_nested_where_query(&query, occur)
    }

    /// Nested group whose callback may fail, e.g. on a bad operator
    pub fn try_where_nested<F>(&mut self, callback: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> Result<()>,
    {
        let mut query = self.new_query();
        callback(&mut query)?;
        Ok(self.add_nested_where_query(&query, Occur::Filter))
    }

    pub fn add_nested_where_query(&mut self, query: &QueryBuilder, occur: Occur) -> &mut Self {
        let nested = query.compile_wheres();
        if !nested.is_empty() {
            self.add_clause(Clause::Bool(nested), occur);
        }
        self
    }

    // ---------------------------------------------------------------
    // Conditional helpers
    // ---------------------------------------------------------------

    pub fn when<F>(&mut self, condition: bool, callback: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        if condition {
            callback(self);
        }
        self
    }

    pub fn unless<F>(&mut self, condition: bool, callback: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.when(!condition, callback)
    }

    pub fn tap<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut QueryBuilder),
    {
        self.when(true, callback)
    }

    // ---------------------------------------------------------------
    // Compilation
    // ---------------------------------------------------------------

    /// The accumulated clause group
    pub fn compile_wheres(&self) -> BoolQuery {
        self.wheres.clone()
    }

    /// Compile every directive into dispatch-ready parameters.
    ///
    /// Pure: compiling twice without mutating the builder yields equal output.
    pub fn compile(&self) -> CompiledSearch {
        let mut script_fields = self.script_fields.clone();

        let source = match &self.source {
            Some(columns) => {
                let mut fields = Vec::with_capacity(columns.len());
                for column in columns {
                    match split_alias(column) {
                        Some((field, alias)) => {
                            if !alias.is_empty() {
                                script_fields
                                    .insert(alias.to_string(), ScriptField::doc_value(field));
                            }
                            fields.push(field.to_string());
                        }
                        None => fields.push(column.clone()),
                    }
                }
                SourceFilter::Fields(fields)
            }
            None => SourceFilter::none(),
        };

        let body = SearchBody {
            sort: self.sort.clone(),
            query: (!self.wheres.is_empty()).then(|| QueryBody {
                bool: self.compile_wheres(),
            }),
            collapse: self.collapse.clone(),
            highlight: (!self.highlight_fields.is_empty()).then(|| Highlight {
                fields: self.highlight_fields.clone(),
            }),
            script_fields,
            aggs: self.aggs.clone(),
            script: self.script.clone().filter(|s| !s.is_null()),
        };

        CompiledSearch {
            index: self.index.clone(),
            doc_type: self.doc_type.clone(),
            source: Some(source),
            from: self.from,
            size: self.size,
            body: (!body.is_empty()).then_some(body),
        }
    }
}

fn default_inner_hits() -> Map<String, Value> {
    let mut defaults = Map::new();
    defaults.insert("name".to_string(), Value::from("items"));
    defaults.insert("size".to_string(), Value::from(DEFAULT_INNER_HITS_SIZE));
    defaults.insert(
        "sort".to_string(),
        serde_json::json!([{ "id": "desc" }]),
    );
    defaults
}

/// `"b as c"` -> `("b", "c")`
fn split_alias(column: &str) -> Option<(&str, &str)> {
    let mut parts = ALIAS_MARKER.splitn(column.trim(), 2);
    let field = parts.next()?;
    let alias = parts.next()?;
    if field.is_empty() {
        return None;
    }
    Some((field, alias.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(query: &QueryBuilder) -> Value {
        query.compile().to_value().unwrap()["body"].clone()
    }

    #[test]
    fn test_split_alias() {
        assert_eq!(split_alias("price as cost"), Some(("price", "cost")));
        assert_eq!(split_alias("price  AS  cost"), Some(("price", "cost")));
        assert_eq!(split_alias("price"), None);
        assert_eq!(split_alias("alias"), None);
    }

    #[test]
    fn test_empty_builder_compiles_to_base_params() {
        let query = QueryBuilder::new("orders");
        let value = query.compile().to_value().unwrap();
        assert_eq!(
            value,
            json!({"index": "orders", "_source": {"includes": [], "excludes": []}})
        );
    }

    #[test]
    fn test_doc_type_included_when_set() {
        let mut query = QueryBuilder::new("orders");
        query.doc_type("_doc");
        assert_eq!(query.compile().to_value().unwrap()["type"], json!("_doc"));
    }

    #[test]
    fn test_negative_offset_and_limit_are_ignored() {
        let mut query = QueryBuilder::new("orders");
        query.offset(10).limit(5).offset(-1).limit(-3);
        let compiled = query.compile();
        assert_eq!(compiled.from, Some(10));
        assert_eq!(compiled.size, Some(5));
    }

    #[test]
    fn test_for_page() {
        let mut query = QueryBuilder::new("orders");
        query.for_page(3, 15);
        let compiled = query.compile();
        assert_eq!(compiled.from, Some(30));
        assert_eq!(compiled.size, Some(15));
    }

    #[test]
    fn test_for_page_zero_keeps_limit_only() {
        let mut query = QueryBuilder::new("orders");
        query.for_page(0, 15);
        let compiled = query.compile();
        assert_eq!(compiled.from, None);
        assert_eq!(compiled.size, Some(15));
    }

    #[test]
    fn test_order_by_prepend() {
        let mut query = QueryBuilder::new("orders");
        query
            .order_by("created_at", "asc")
            .order_by("id", "DESC")
            .order_by_prepend("score", "asc");
        assert_eq!(
            body(&query)["sort"],
            json!([{"score": "asc"}, {"created_at": "asc"}, {"id": "desc"}])
        );
    }

    #[test]
    fn test_operator_mapping() {
        let mut query = QueryBuilder::new("orders");
        query
            .where_op("age", ">", 18)
            .unwrap()
            .where_op("status", "!=", "deleted")
            .unwrap()
            .where_op("title", "match", "rust")
            .unwrap()
            .where_op("title", "not match", "java")
            .unwrap()
            .where_op("body", "like", "zero downtime")
            .unwrap()
            .where_op("body", "not like", "big bang")
            .unwrap();

        assert_eq!(
            body(&query)["query"]["bool"],
            json!({
                "filter": [
                    {"range": {"age": {"gt": 18}}},
                    {"match": {"title": "rust"}},
                    {"match_phrase": {"body": "zero downtime"}}
                ],
                "must_not": [
                    {"term": {"status": "deleted"}},
                    {"match": {"title": "java"}},
                    {"match_phrase": {"body": "big bang"}}
                ]
            })
        );
    }

    #[test]
    fn test_unknown_operator_fails_at_call_site() {
        let mut query = QueryBuilder::new("orders");
        assert!(query.where_op("age", "=~", 1).is_err());
        assert!(query.where_range("age", "=", 1, Occur::Filter).is_err());
        assert!(query.add_where(Clause::exists("age"), "sometimes").is_err());
        assert!(query.compile().query().is_none());
    }

    #[test]
    fn test_or_where_not_equal_still_excludes() {
        let mut query = QueryBuilder::new("orders");
        query.or_where_op("status", "<>", "void").unwrap();
        let compiled = query.compile();
        let bool_query = compiled.query().unwrap();
        assert!(bool_query.should.is_empty());
        assert_eq!(bool_query.must_not, vec![Clause::term("status", "void")]);
    }

    #[test]
    fn test_where_map_groups_terms() {
        let mut query = QueryBuilder::new("orders");
        query.where_map([("status", json!("paid")), ("currency", json!("EUR"))]);
        assert_eq!(
            body(&query)["query"]["bool"]["filter"],
            json!([{"bool": {"filter": [
                {"term": {"status": "paid"}},
                {"term": {"currency": "EUR"}}
            ]}}])
        );
    }

    #[test]
    fn test_or_where_map_is_required_alternative() {
        let mut query = QueryBuilder::new("orders");
        query
            .where_eq("tenant", 1)
            .or_where_map([("status", json!("paid")), ("status", json!("shipped"))]);

        assert_eq!(
            body(&query)["query"]["bool"],
            json!({
                "filter": [
                    {"term": {"tenant": 1}},
                    {"bool": {"should": [
                        {"term": {"status": "paid"}},
                        {"term": {"status": "shipped"}}
                    ]}}
                ]
            })
        );
    }

    #[test]
    fn test_for_page_saturates() {
        let mut query = QueryBuilder::new("orders");
        query.for_page(i64::MIN, 10);
        let compiled = query.compile();
        assert_eq!(compiled.from, None);
        assert_eq!(compiled.size, Some(10));

        query.for_page(i64::MAX, i64::MAX);
        let compiled = query.compile();
        assert_eq!(compiled.from, Some(i64::MAX as u64));
    }

    #[test]
    fn test_try_where_nested_propagates_error() {
        let mut query = QueryBuilder::new("orders");
        let result = query.try_where_nested(|q| {
            q.where_op("age", "between", 3)?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(query.compile().query().is_none());
    }

    #[test]
    fn test_between_and_exists() {
        let mut query = QueryBuilder::new("orders");
        query
            .where_between("total", 10, 20)
            .where_not_between("age", 0, 17)
            .where_exists("paid_at")
            .where_null("deleted_at");
        assert_eq!(
            body(&query)["query"]["bool"],
            json!({
                "filter": [
                    {"range": {"total": {"gte": 10, "lte": 20}}},
                    {"exists": {"field": "paid_at"}}
                ],
                "must_not": [
                    {"range": {"age": {"gte": 0, "lte": 17}}},
                    {"exists": {"field": "deleted_at"}}
                ]
            })
        );
    }

    #[test]
    fn test_in_variants() {
        let mut query = QueryBuilder::new("orders");
        query
            .where_in("status", ["paid", "shipped"])
            .where_not_in("region", ["eu"])
            .or_where_in("tag", [1, 2]);
        assert_eq!(
            body(&query)["query"]["bool"],
            json!({
                "filter": [{"terms": {"status": ["paid", "shipped"]}}],
                "should": [{"terms": {"tag": [1, 2]}}],
                "must_not": [{"terms": {"region": ["eu"]}}]
            })
        );
    }

    #[test]
    fn test_multi_match() {
        let mut options = Map::new();
        options.insert("type".to_string(), json!("best_fields"));
        let mut query = QueryBuilder::new("docs");
        query.where_multi_match(["title", "body"], "rust", options, Occur::Must);
        assert_eq!(
            body(&query)["query"]["bool"]["must"],
            json!([{"multi_match": {
                "query": "rust",
                "fields": ["title", "body"],
                "type": "best_fields"
            }}])
        );
    }

    #[test]
    fn test_collapse_overrides_merge() {
        let mut overrides = Map::new();
        overrides.insert("size".to_string(), json!(2));
        let mut query = QueryBuilder::new("orders");
        query.collapse_with("customer_id", overrides, 3);
        assert_eq!(
            body(&query)["collapse"],
            json!({
                "field": "customer_id",
                "inner_hits": {"name": "items", "size": 2, "sort": [{"id": "desc"}]},
                "max_concurrent_group_searches": 3
            })
        );
    }

    #[test]
    fn test_highlight_overwrites_same_field() {
        let mut query = QueryBuilder::new("docs");
        query.highlight("title").highlight_with("title", "<b>", "</b>");
        assert_eq!(
            body(&query)["highlight"],
            json!({"fields": {"title": {"pre_tags": ["<b>"], "post_tags": ["</b>"]}}})
        );
    }

    #[test]
    fn test_aggregations() {
        let mut query = QueryBuilder::new("orders");
        query
            .aggregation("user_id")
            .aggregation_with("total", "sum", Some("revenue"))
            .aggregation_with("total", "avg", Some("revenue"));
        assert_eq!(
            body(&query)["aggs"],
            json!({
                "user_id": {"cardinality": {"field": "user_id"}},
                "revenue": {"avg": {"field": "total"}}
            })
        );
    }

    #[test]
    fn test_script_creates_body() {
        let mut query = QueryBuilder::new("orders");
        query.script(json!({"source": "ctx._source.views += 1"}));
        assert_eq!(
            body(&query),
            json!({"script": {"source": "ctx._source.views += 1"}})
        );
    }

    #[test]
    fn test_add_alias_last_write_wins() {
        let mut query = QueryBuilder::new("orders");
        query.add_alias("a", "x").add_alias("b", "x").add_alias("", "y");
        assert_eq!(
            body(&query)["script_fields"],
            json!({"x": {
                "script": {"source": "doc['b'].value", "lang": "painless"},
                "ignore_failure": false
            }})
        );
    }

    #[test]
    fn test_when_unless() {
        let mut query = QueryBuilder::new("orders");
        query
            .when(true, |q| {
                q.where_eq("a", 1);
            })
            .when(false, |q| {
                q.where_eq("b", 2);
            })
            .unless(false, |q| {
                q.where_eq("c", 3);
            });
        let compiled = query.compile();
        assert_eq!(
            compiled.query().unwrap().filter,
            vec![Clause::term("a", 1), Clause::term("c", 3)]
        );
    }

    #[test]
    fn test_add_select_appends() {
        let mut query = QueryBuilder::new("orders");
        query.add_select(["id"]).add_select(["total"]);
        assert_eq!(
            query.compile().to_value().unwrap()["_source"],
            json!(["id", "total"])
        );
    }

    #[test]
    fn test_new_query_shares_only_index() {
        let mut query = QueryBuilder::new("orders");
        query.where_eq("a", 1).limit(3).doc_type("_doc");
        let fresh = query.new_query();
        assert_eq!(fresh.index_name(), "orders");
        let compiled = fresh.compile();
        assert!(compiled.query().is_none());
        assert_eq!(compiled.size, None);
        assert_eq!(compiled.doc_type, None);
    }
}
