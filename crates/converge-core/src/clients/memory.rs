// # Memory Resource Client
//
// In-memory implementation of ResourceClient.
//
// ## Purpose
//
// Provides a simple, fast resource backend that doesn't persist across
// restarts. Useful for testing the full convergence contract against a
// "live" client, and for local dry-run rehearsals of a declaration set.
//
// ## Identity
//
// Created resources get a monotonic remote-style identity ("mem-1",
// "mem-2", ...) so the engine's identity pass-through can be observed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::resource::{ObservedState, Properties};
use crate::traits::{ResourceClient, ResourceClientFactory};

#[derive(Debug, Clone)]
struct StoredResource {
    identity: String,
    properties: Properties,
}

/// In-memory resource client implementation
///
/// All resources live in a HashMap protected by a RwLock. Supports
/// in-place update, so `ensure_present` on an existing resource diffs
/// and patches rather than no-opping.
///
/// # Example
///
/// ```rust,no_run
/// use converge_core::clients::MemoryResourceClient;
/// use converge_core::traits::ResourceClient;
/// use converge_core::resource::Properties;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = MemoryResourceClient::new();
///
///     let applied = client.create("cirros", &Properties::new()).await?;
///     assert!(applied.is_empty());
///
///     let observed = client.get("cirros").await?;
///     assert!(observed.exists());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceClient {
    inner: Arc<RwLock<HashMap<String, StoredResource>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryResourceClient {
    /// Create a new empty memory client
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of resources held
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the client holds no resources
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remove all resources
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl ResourceClient for MemoryResourceClient {
    async fn get(&self, name: &str) -> Result<ObservedState> {
        let guard = self.inner.read().await;
        Ok(match guard.get(name) {
            Some(stored) => ObservedState::Present {
                identity: stored.identity.clone(),
                properties: stored.properties.clone(),
            },
            None => ObservedState::Absent,
        })
    }

    async fn create(&self, name: &str, properties: &Properties) -> Result<Properties> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(name) {
            return Err(Error::mutation(format!("{} already exists", name)));
        }

        let identity = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        guard.insert(
            name.to_string(),
            StoredResource {
                identity,
                properties: properties.clone(),
            },
        );
        Ok(properties.clone())
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        let name = guard
            .iter()
            .find(|(_, stored)| stored.identity == identity)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::mutation(format!("no resource with identity {}", identity)))?;
        guard.remove(&name);
        Ok(())
    }

    async fn update(&self, identity: &str, delta: &Properties) -> Result<Properties> {
        let mut guard = self.inner.write().await;
        let stored = guard
            .values_mut()
            .find(|stored| stored.identity == identity)
            .ok_or_else(|| Error::mutation(format!("no resource with identity {}", identity)))?;

        for (key, value) in delta {
            stored.properties.insert(key.clone(), value.clone());
        }
        Ok(delta.clone())
    }

    fn supports_update(&self) -> bool {
        true
    }

    fn client_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the memory backend
pub struct MemoryClientFactory;

impl ResourceClientFactory for MemoryClientFactory {
    fn create(&self, _config: &ClientConfig) -> Result<Box<dyn ResourceClient>> {
        Ok(Box::new(MemoryResourceClient::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_client_basic() {
        let client = MemoryResourceClient::new();

        // Initially empty
        assert!(client.is_empty().await);
        assert_eq!(client.get("cirros").await.unwrap(), ObservedState::Absent);

        // Create and get
        let mut properties = Properties::new();
        properties.insert("image_format".to_string(), json!("raw"));
        client.create("cirros", &properties).await.unwrap();

        let observed = client.get("cirros").await.unwrap();
        assert!(observed.exists());
        assert_eq!(observed.properties().unwrap(), &properties);

        // Delete by the observed identity
        let identity = observed.identity().unwrap().to_string();
        client.delete(&identity).await.unwrap();
        assert_eq!(client.len().await, 0);
    }

    #[tokio::test]
    async fn test_memory_client_duplicate_create_fails() {
        let client = MemoryResourceClient::new();
        client.create("cirros", &Properties::new()).await.unwrap();

        let err = client.create("cirros", &Properties::new()).await.unwrap_err();
        assert!(err.is_mutation());
    }

    #[tokio::test]
    async fn test_memory_client_update_merges_delta() {
        let client = MemoryResourceClient::new();
        let mut properties = Properties::new();
        properties.insert("image_format".to_string(), json!("qcow2"));
        client.create("cirros", &properties).await.unwrap();

        let identity = client
            .get("cirros")
            .await
            .unwrap()
            .identity()
            .unwrap()
            .to_string();

        let mut delta = Properties::new();
        delta.insert("image_format".to_string(), json!("raw"));
        client.update(&identity, &delta).await.unwrap();

        let observed = client.get("cirros").await.unwrap();
        assert_eq!(
            observed.properties().unwrap().get("image_format"),
            Some(&json!("raw"))
        );
    }

    #[tokio::test]
    async fn test_memory_client_delete_unknown_identity_fails() {
        let client = MemoryResourceClient::new();
        let err = client.delete("mem-404").await.unwrap_err();
        assert!(err.is_mutation());
    }
}
