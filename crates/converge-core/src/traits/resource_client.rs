// # Resource Client Trait
//
// Defines the capability interface for querying and mutating one remote
// resource type.
//
// ## Implementations
//
// - HTTP/JSON: `converge-client-http` crate
// - In-memory: `converge_core::clients::MemoryResourceClient`
//
// ## Division of responsibility
//
// Clients are thin, stateless adapters around one remote API:
//
// - One remote call per trait method, no retry or backoff (retry policy
//   belongs to the engine's caller)
// - No caching: every `get` hits the remote system, which is authoritative
// - No convergence decisions: whether to create, delete, or update is
//   owned by the `ConvergenceEngine`
// - Dry-run is enforced by the engine; a client never sees a mutating
//   call that dry-run suppressed

use crate::error::{Error, Result};
use crate::resource::{ObservedState, Properties};
use async_trait::async_trait;

/// Trait for resource client implementations
///
/// One client handles one resource type. The engine resolves the client
/// for a declaration once at startup through the registry and then calls
/// at most `get` plus one mutating method per convergence call.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Error contract
///
/// - `get` fails with [`Error::Query`] on transport/auth failure and
///   returns `Ok(ObservedState::Absent)`, not an error, when the
///   resource genuinely does not exist.
/// - `create`, `delete`, and `update` fail with [`Error::Mutation`]
///   (or [`Error::Unsupported`] for `update` on clients without the
///   capability).
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Query the current remote state of a named resource
    async fn get(&self, name: &str) -> Result<ObservedState>;

    /// Create a resource with the given properties
    ///
    /// Returns the properties the remote system reports as applied.
    /// Implementations that cannot echo applied properties may return an
    /// empty mapping; the engine then reports the desired set as changed.
    async fn create(&self, name: &str, properties: &Properties) -> Result<Properties>;

    /// Delete the resource with the given remote identity
    ///
    /// The identity is the opaque value a previous `get` observed; the
    /// engine passes it through untouched.
    async fn delete(&self, identity: &str) -> Result<()>;

    /// Apply a property delta to an existing resource
    ///
    /// In-place update is a per-resource-type extension point: clients
    /// that support it override this method and `supports_update`.
    async fn update(&self, identity: &str, delta: &Properties) -> Result<Properties> {
        let _ = (identity, delta);
        Err(Error::unsupported(format!(
            "{} does not support in-place update",
            self.client_name()
        )))
    }

    /// Whether this client supports in-place update
    ///
    /// When false, the engine treats "present and already existing" as a
    /// no-op without diffing properties.
    fn supports_update(&self) -> bool {
        false
    }

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}

/// Helper trait for constructing resource clients from configuration
pub trait ResourceClientFactory: Send + Sync {
    /// Create a ResourceClient instance from configuration
    fn create(&self, config: &crate::config::ClientConfig) -> Result<Box<dyn ResourceClient>>;
}
