//! Client lookup by connection pool name

use crate::client::HttpClient;
use crate::config::ClientConfig;
use parking_lot::RwLock;
use sift::client::AdminClient;
use sift::{IndexDescriptor, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds one [`HttpClient`] per pool on first use and hands out shared handles
pub struct ClientFactory {
    config: ClientConfig,
    clients: RwLock<HashMap<String, Arc<HttpClient>>>,
}

impl ClientFactory {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clients: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get(&self, pool: &str) -> Result<Arc<HttpClient>> {
        {
            let clients = self.clients.read();
            if let Some(client) = clients.get(pool) {
                return Ok(client.clone());
            }
        }

        let client = Arc::new(HttpClient::new(pool, self.config.pool(pool)?)?);

        let mut clients = self.clients.write();
        // Another caller may have built it in the meantime
        let client = clients.entry(pool.to_string()).or_insert(client).clone();
        tracing::debug!("Client pool '{}' ready ({} pools cached)", pool, clients.len());
        Ok(client)
    }

    /// Client for the pool a descriptor names
    pub fn for_descriptor(&self, descriptor: &IndexDescriptor) -> Result<Arc<dyn AdminClient>> {
        let client: Arc<dyn AdminClient> = self.get(descriptor.pool())?;
        Ok(client)
    }

    /// Drop cached clients, e.g. after a config reload
    pub fn clear(&self) {
        self.clients.write().clear();
    }
}
