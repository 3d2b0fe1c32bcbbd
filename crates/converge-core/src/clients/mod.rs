//! Built-in resource client implementations
//!
//! - [`MemoryResourceClient`]: in-memory reference implementation

pub mod memory;

pub use memory::{MemoryClientFactory, MemoryResourceClient};

/// Register the built-in client backends with a registry
pub fn register(registry: &crate::registry::ClientRegistry) {
    registry.register_client("memory", Box::new(MemoryClientFactory));
}
