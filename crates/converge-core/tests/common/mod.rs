//! Test doubles and common utilities for convergence contract tests
//!
//! This module provides minimal test doubles that verify the engine's
//! contract without reaching any real remote system.

use converge_core::config::EngineConfig;
use converge_core::engine::{ConvergenceEngine, EngineEvent};
use converge_core::error::{Error, Result};
use converge_core::resource::{DesiredState, ObservedState, Properties};
use converge_core::traits::ResourceClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// A scripted ResourceClient that tracks calls
///
/// `get` returns a scripted ObservedState; every operation can be made to
/// fail with a scripted error text. All call counters are shared through
/// `Arc` so a clone handed to the engine still reports into the original.
pub struct MockResourceClient {
    /// Scripted response for get()
    observed: Arc<std::sync::Mutex<ObservedState>>,
    /// Scripted failure texts, one per operation
    get_failure: Arc<std::sync::Mutex<Option<String>>>,
    create_failure: Arc<std::sync::Mutex<Option<String>>>,
    delete_failure: Arc<std::sync::Mutex<Option<String>>>,
    update_failure: Arc<std::sync::Mutex<Option<String>>>,
    /// Call counters
    get_call_count: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    delete_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    /// Recorded mutation arguments
    created: Arc<std::sync::Mutex<Vec<(String, Properties)>>>,
    deleted: Arc<std::sync::Mutex<Vec<String>>>,
    updated: Arc<std::sync::Mutex<Vec<(String, Properties)>>>,
    /// Whether this mock advertises in-place update support
    update_supported: bool,
}

impl MockResourceClient {
    /// Create a mock that observes an absent resource
    pub fn absent() -> Self {
        Self::with_observed(ObservedState::Absent)
    }

    /// Create a mock that observes a present resource
    pub fn present(identity: &str, properties: Properties) -> Self {
        Self::with_observed(ObservedState::Present {
            identity: identity.to_string(),
            properties,
        })
    }

    /// Create a mock with an arbitrary scripted observation
    pub fn with_observed(observed: ObservedState) -> Self {
        Self {
            observed: Arc::new(std::sync::Mutex::new(observed)),
            get_failure: Arc::new(std::sync::Mutex::new(None)),
            create_failure: Arc::new(std::sync::Mutex::new(None)),
            delete_failure: Arc::new(std::sync::Mutex::new(None)),
            update_failure: Arc::new(std::sync::Mutex::new(None)),
            get_call_count: Arc::new(AtomicUsize::new(0)),
            create_call_count: Arc::new(AtomicUsize::new(0)),
            delete_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            created: Arc::new(std::sync::Mutex::new(Vec::new())),
            deleted: Arc::new(std::sync::Mutex::new(Vec::new())),
            updated: Arc::new(std::sync::Mutex::new(Vec::new())),
            update_supported: false,
        }
    }

    /// Create a new mock that shares counters and scripting with an
    /// existing one (for handing a boxed clone to the engine)
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            observed: Arc::clone(&other.observed),
            get_failure: Arc::clone(&other.get_failure),
            create_failure: Arc::clone(&other.create_failure),
            delete_failure: Arc::clone(&other.delete_failure),
            update_failure: Arc::clone(&other.update_failure),
            get_call_count: Arc::clone(&other.get_call_count),
            create_call_count: Arc::clone(&other.create_call_count),
            delete_call_count: Arc::clone(&other.delete_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            created: Arc::clone(&other.created),
            deleted: Arc::clone(&other.deleted),
            updated: Arc::clone(&other.updated),
            update_supported: other.update_supported,
        }
    }

    /// Advertise in-place update support
    pub fn with_update_support(mut self) -> Self {
        self.update_supported = true;
        self
    }

    /// Make get() fail with the given text
    pub fn fail_get(self, message: &str) -> Self {
        *self.get_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Make create() fail with the given text
    pub fn fail_create(self, message: &str) -> Self {
        *self.create_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Make delete() fail with the given text
    pub fn fail_delete(self, message: &str) -> Self {
        *self.delete_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Make update() fail with the given text
    pub fn fail_update(self, message: &str) -> Self {
        *self.update_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.get_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Total mutating calls observed
    pub fn mutation_call_count(&self) -> usize {
        self.create_call_count() + self.delete_call_count() + self.update_call_count()
    }

    /// Recorded create arguments
    pub fn created(&self) -> Vec<(String, Properties)> {
        self.created.lock().unwrap().clone()
    }

    /// Recorded delete identities
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Recorded update arguments
    pub fn updated(&self) -> Vec<(String, Properties)> {
        self.updated.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResourceClient for MockResourceClient {
    async fn get(&self, _name: &str) -> Result<ObservedState> {
        self.get_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.get_failure.lock().unwrap().clone() {
            return Err(Error::query(message));
        }
        Ok(self.observed.lock().unwrap().clone())
    }

    async fn create(&self, name: &str, properties: &Properties) -> Result<Properties> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.create_failure.lock().unwrap().clone() {
            return Err(Error::mutation(message));
        }
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), properties.clone()));
        Ok(properties.clone())
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.delete_failure.lock().unwrap().clone() {
            return Err(Error::mutation(message));
        }
        self.deleted.lock().unwrap().push(identity.to_string());
        Ok(())
    }

    async fn update(&self, identity: &str, delta: &Properties) -> Result<Properties> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.update_failure.lock().unwrap().clone() {
            return Err(Error::mutation(message));
        }
        self.updated
            .lock()
            .unwrap()
            .push((identity.to_string(), delta.clone()));
        Ok(delta.clone())
    }

    fn supports_update(&self) -> bool {
        self.update_supported
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// Build an engine with no resolved clients, for direct operation calls
pub fn bare_engine() -> (ConvergenceEngine, mpsc::Receiver<EngineEvent>) {
    ConvergenceEngine::new(HashMap::new(), EngineConfig::default())
}

/// Build an engine owning the given clients
pub fn engine_with(
    clients: HashMap<String, Box<dyn ResourceClient>>,
    config: EngineConfig,
) -> (ConvergenceEngine, mpsc::Receiver<EngineEvent>) {
    ConvergenceEngine::new(clients, config)
}

/// Shorthand for a declaration with one property
pub fn desired_with(
    name: &str,
    resource_type: &str,
    key: &str,
    value: impl Into<serde_json::Value>,
) -> DesiredState {
    DesiredState::new(name, resource_type).with_property(key, value)
}

/// Drain every event currently buffered on the receiver
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
