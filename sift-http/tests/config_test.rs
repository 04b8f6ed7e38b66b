//! Tests for pool configuration loading

use sift::Error;
use sift_http::{ClientConfig, ClientFactory, PoolConfig};
use tempfile::tempdir;

#[test]
fn test_load_from_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[pools.default]
hosts = ["http://127.0.0.1:9200"]
max_connections = 16
timeout_secs = 5
username = "elastic"
password = "changeme"
"#,
    )
    .unwrap();

    let config = ClientConfig::load_from(&path).unwrap();
    let pool = config.pool("default").unwrap();
    assert_eq!(pool.max_connections, 16);
    assert_eq!(pool.timeout_secs, 5);
    assert_eq!(pool.username.as_deref(), Some("elastic"));
}

#[test]
fn test_missing_file() {
    let temp = tempdir().unwrap();
    let err = ClientConfig::load_from(&temp.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigurationMissing(_)));
}

#[test]
fn test_save_and_load() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("nested").join("config.toml");

    let mut config = ClientConfig::default();
    config.pools.insert(
        "logs".to_string(),
        PoolConfig {
            hosts: vec!["https://logs.internal:9200".to_string()],
            max_connections: 8,
            ..PoolConfig::default()
        },
    );
    config.save(&path).unwrap();

    let loaded = ClientConfig::load_from(&path).unwrap();
    assert_eq!(loaded.pools.len(), 2);
    assert_eq!(loaded.pool("logs").unwrap().max_connections, 8);
}

#[test]
fn test_factory_from_loaded_config() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        "[pools.search]\nhosts = [\"http://a:9200\", \"http://b:9200\"]\n",
    )
    .unwrap();

    let factory = ClientFactory::new(ClientConfig::load_from(&path).unwrap()).unwrap();
    let client = factory.get("search").unwrap();
    assert_eq!(client.hosts().len(), 2);
    assert_eq!(client.pool(), "search");
    assert!(matches!(factory.get("default"), Err(Error::ClientResolution(_))));
}
