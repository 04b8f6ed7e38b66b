//! HttpClient against a local mock server

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use sift::client::AliasAction;
use sift::{AdminClient, Error, QueryBuilder};
use sift_http::{HttpClient, PoolConfig};

fn client_for(server: &ServerGuard) -> HttpClient {
    let pool = PoolConfig {
        hosts: vec![server.url()],
        ..PoolConfig::default()
    };
    HttpClient::new("default", &pool).unwrap()
}

#[tokio::test]
async fn test_exists_maps_status() {
    let mut server = Server::new_async().await;
    let _found = server
        .mock("HEAD", "/orders_3")
        .with_status(200)
        .create_async()
        .await;
    let _missing = server
        .mock("HEAD", "/orders_4")
        .with_status(404)
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(client.exists("orders_3").await.unwrap());
    assert!(!client.exists("orders_4").await.unwrap());
}

#[tokio::test]
async fn test_get_alias() {
    let mut server = Server::new_async().await;
    let _orders = server
        .mock("GET", "/_alias/orders")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"orders_3":{"aliases":{"orders":{}}}}"#)
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/_alias/invoices")
        .with_status(404)
        .with_body(r#"{"error":"alias [invoices] missing","status":404}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let targets = client.get_alias("orders").await.unwrap();
    assert_eq!(targets.keys().collect::<Vec<_>>(), vec!["orders_3"]);
    assert!(client.get_alias("invoices").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_error_status_becomes_administration_error() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("PUT", "/orders_4")
        .with_status(400)
        .with_body("resource_already_exists_exception")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .create("orders_4", &json!({}), &json!({}), &[])
        .await
        .unwrap_err();
    match err {
        Error::Administration {
            operation,
            index,
            reason,
        } => {
            assert_eq!(operation, "create");
            assert_eq!(index, "orders_4");
            assert!(reason.contains("400"));
            assert!(reason.contains("resource_already_exists_exception"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_aliases_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/_aliases")
        .match_body(Matcher::Json(json!({
            "actions": [
                {"add": {"index": "orders_4", "alias": "orders"}},
                {"remove": {"index": "orders_3", "alias": "orders"}}
            ]
        })))
        .with_status(200)
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .update_aliases(&[
            AliasAction::add("orders_4", "orders"),
            AliasAction::remove("orders_3", "orders"),
        ])
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_count_uses_typed_path() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/orders/_doc/_count")
        .match_body(Matcher::Json(json!({
            "query": {"bool": {"filter": [{"term": {"status": "paid"}}]}}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"count":42,"_shards":{"total":1}}"#)
        .create_async()
        .await;

    let mut query = QueryBuilder::new("orders");
    query.doc_type("_doc").where_eq("status", "paid");

    let client = client_for(&server);
    assert_eq!(client.count(&query.compile()).await.unwrap(), 42);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_count_without_count_field_fails() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/orders/_count")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hits":{}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .count(&QueryBuilder::new("orders").compile())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("response has no count"));
}

#[tokio::test]
async fn test_delete_by_query_without_where_is_rejected() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/orders/_delete_by_query")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .delete_by_query(&QueryBuilder::new("orders").compile())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQueryArgument(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reindex_waits_for_completion() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/_reindex")
        .match_query(Matcher::UrlEncoded(
            "wait_for_completion".to_string(),
            "true".to_string(),
        ))
        .match_body(Matcher::Json(json!({
            "source": {"index": "orders_3"},
            "dest": {"index": "orders_4"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"total":12,"created":12}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let response = client.reindex("orders_3", "orders_4").await.unwrap();
    assert_eq!(response["created"], 12);
    mock.assert_async().await;
}
