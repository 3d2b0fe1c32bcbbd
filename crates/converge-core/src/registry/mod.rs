//! Plugin-based client registry
//!
//! The registry allows resource clients to be registered dynamically at
//! startup, replacing string-keyed dispatch-table lookups at call time
//! with explicit polymorphic interfaces resolved exactly once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use converge_core::registry::ClientRegistry;
//!
//! let registry = ClientRegistry::new();
//!
//! // Register backends (each client crate provides a register() fn)
//! converge_client_http::register(&registry);
//! converge_core::clients::register(&registry);
//!
//! // Resolve the configured clients once, then build the engine
//! let clients = registry.resolve(&config.clients)?;
//! let (engine, events) = ConvergenceEngine::new(clients, config.engine);
//! ```

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::traits::{ResourceClient, ResourceClientFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based resource client creation
///
/// The registry maintains a map of backend type names to factory objects,
/// allowing dynamic instantiation of clients based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ClientRegistry {
    /// Registered resource client factories, keyed by backend type name
    factories: RwLock<HashMap<String, Box<dyn ResourceClientFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource client factory
    ///
    /// # Parameters
    ///
    /// - `name`: backend type name (e.g., "http", "memory")
    /// - `factory`: factory object for creating client instances
    pub fn register_client(&self, name: impl Into<String>, factory: Box<dyn ResourceClientFactory>) {
        let name = name.into();
        let mut factories = self.factories.write().unwrap();
        factories.insert(name, factory);
    }

    /// Create a resource client from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ResourceClient>)`: created client instance
    /// - `Err(Error)`: if the backend type is not registered or creation
    ///   fails
    pub fn create_client(&self, config: &ClientConfig) -> Result<Box<dyn ResourceClient>> {
        let backend_type = config.backend.type_name();
        let factories = self.factories.read().unwrap();

        let factory = factories
            .get(backend_type)
            .ok_or_else(|| Error::config(format!("unknown client backend: {}", backend_type)))?;

        factory.create(config)
    }

    /// Resolve every configured client into a resource-type → client map
    ///
    /// Called once at startup; the engine never resolves clients per call.
    /// Two client configs for the same resource type are a configuration
    /// error.
    pub fn resolve(
        &self,
        configs: &[ClientConfig],
    ) -> Result<HashMap<String, Box<dyn ResourceClient>>> {
        let mut clients = HashMap::new();
        for config in configs {
            let client = self.create_client(config)?;
            if clients.insert(config.resource_type.clone(), client).is_some() {
                return Err(Error::config(format!(
                    "duplicate client for resource type {}",
                    config.resource_type
                )));
            }
        }
        Ok(clients)
    }

    /// List all registered backend type names
    pub fn list_clients(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap();
        factories.keys().cloned().collect()
    }

    /// Check if a backend type is registered
    pub fn has_client(&self, name: &str) -> bool {
        let factories = self.factories.read().unwrap();
        factories.contains_key(name)
    }
}
