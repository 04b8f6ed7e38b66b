//! Query builder compilation tests

use serde_json::json;
use sift::query::{Occur, QueryBuilder};
use sift::Error;

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_where_eq_matches_explicit_equals() {
    let mut implicit = QueryBuilder::new("orders");
    implicit.where_eq("status", "paid");

    let mut explicit = QueryBuilder::new("orders");
    explicit.where_op("status", "=", "paid").unwrap();

    assert_eq!(implicit.compile(), explicit.compile());
}

#[test]
fn test_no_predicates_no_query() {
    let mut query = QueryBuilder::new("orders");
    query.order_by("created_at", "desc").limit(10);

    let compiled = query.compile().to_value().unwrap();
    assert!(compiled["body"].get("query").is_none());
    assert_eq!(compiled["body"]["sort"], json!([{"created_at": "desc"}]));
}

#[test]
fn test_full_document() {
    let mut query = QueryBuilder::new("orders");
    query
        .where_eq("status", "paid")
        .or_where_eq("channel", "web")
        .where_op("total", ">=", 100)
        .unwrap()
        .where_op("note", "not like", "test order")
        .unwrap()
        .where_nested(|q| {
            q.where_eq("region", "eu").where_exists("vat_id");
        })
        .order_by("id", "asc")
        .skip(20)
        .take(10);

    assert_eq!(
        query.compile().to_value().unwrap(),
        json!({
            "index": "orders",
            "_source": {"includes": [], "excludes": []},
            "from": 20,
            "size": 10,
            "body": {
                "sort": [{"id": "asc"}],
                "query": {
                    "bool": {
                        "filter": [
                            {"term": {"status": "paid"}},
                            {"range": {"total": {"gte": 100}}},
                            {"bool": {"filter": [
                                {"term": {"region": "eu"}},
                                {"exists": {"field": "vat_id"}}
                            ]}}
                        ],
                        "should": [{"term": {"channel": "web"}}],
                        "must_not": [{"match_phrase": {"note": "test order"}}]
                    }
                }
            }
        })
    );
}

#[test]
fn test_empty_nested_group_contributes_nothing() {
    let mut with_empty = QueryBuilder::new("orders");
    with_empty.where_eq("status", "paid").where_nested(|_| {});

    let mut plain = QueryBuilder::new("orders");
    plain.where_eq("status", "paid");

    assert_eq!(with_empty.compile(), plain.compile());

    let mut only_empty = QueryBuilder::new("orders");
    only_empty.where_nested(|_| {}).or_where_nested(|_| {});
    assert!(only_empty.compile().query().is_none());
}

#[test]
fn test_unknown_occur_is_rejected() {
    let mut query = QueryBuilder::new("orders");
    let err = query
        .add_where(sift::query::Clause::term("status", "paid"), "maybe")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQueryArgument(_)));
    assert!(query.compile().query().is_none());
}

#[test]
fn test_where_range_bad_operator() {
    let mut query = QueryBuilder::new("orders");
    assert!(query.where_range("total", "=>", 5, Occur::Filter).is_err());
}

// ============================================================================
// Projection and directives
// ============================================================================

#[test]
fn test_select_with_alias() {
    let mut query = QueryBuilder::new("orders");
    query.select(["a", "b as c"]);

    let compiled = query.compile().to_value().unwrap();
    assert_eq!(compiled["_source"], json!(["a", "b"]));
    assert_eq!(
        compiled["body"]["script_fields"],
        json!({
            "c": {
                "script": {"source": "doc['b'].value", "lang": "painless"},
                "ignore_failure": false
            }
        })
    );
}

#[test]
fn test_collapse_defaults() {
    let mut query = QueryBuilder::new("orders");
    query.collapse("group_id");

    let compiled = query.compile().to_value().unwrap();
    assert_eq!(
        compiled["body"]["collapse"],
        json!({
            "field": "group_id",
            "inner_hits": {"name": "items", "size": 5, "sort": [{"id": "desc"}]},
            "max_concurrent_group_searches": 5
        })
    );
}

#[test]
fn test_sort_direction_normalization() {
    for direction in ["DESC", "desc", "bogus"] {
        let mut query = QueryBuilder::new("orders");
        query.order_by("id", direction);
        assert_eq!(
            query.compile().to_value().unwrap()["body"]["sort"],
            json!([{"id": "desc"}]),
            "direction {direction}"
        );
    }

    let mut query = QueryBuilder::new("orders");
    query.order_by("id", "ASC");
    assert_eq!(
        query.compile().to_value().unwrap()["body"]["sort"],
        json!([{"id": "asc"}])
    );
}

#[test]
fn test_compile_is_repeatable() {
    let mut query = QueryBuilder::new("orders");
    query
        .select(["id", "price as cost"])
        .where_in("status", ["paid", "shipped"])
        .aggregation("customer_id")
        .highlight("note");

    assert_eq!(query.compile(), query.compile());
}
