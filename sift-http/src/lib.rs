//! HTTP transport for sift
//!
//! - [`ClientConfig`]: named connection pools loaded from TOML
//! - [`HttpClient`]: reqwest implementation of [`sift::AdminClient`]
//! - [`ClientFactory`]: one cached client per pool

pub mod client;
pub mod config;
pub mod factory;

pub use client::HttpClient;
pub use config::{default_config_path, ClientConfig, PoolConfig};
pub use factory::ClientFactory;
