// # converge-core
//
// Core library for the declarative state-reconciliation engine.
//
// ## Architecture Overview
//
// This library provides the generic present/absent convergence contract:
// - **ResourceClient**: Trait for querying and mutating one remote
//   resource type
// - **ConvergenceEngine**: Core engine that reconciles declared state
//   against observed remote state with minimal necessary mutation
// - **ClientRegistry**: Plugin-based registry for resource client
//   backends, resolved once at startup
// - **ConvergenceResult / BatchReport**: Uniform structured-result
//   contract for batch orchestration
//
// ## Design Principles
//
// 1. **Remote is authoritative**: Observed state is queried fresh on
//    every call, never cached
// 2. **At most one mutation per call**: The engine never retries; retry
//    policy belongs to the caller
// 3. **Dry-run is a guarantee**: With dry-run set, zero mutating client
//    calls are made, and the predicted change set is reported instead
// 4. **Failure is a result, not an exception**: Client errors become
//    `Failed` results so batch orchestration continues past them;
//    query failures stay distinct from genuine absence

pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod report;
pub mod resource;
pub mod traits;

// Re-export core types for convenience
pub use config::{ClientBackend, ClientConfig, ConvergeConfig, EngineConfig, ResourceConfig};
pub use engine::{ConvergenceEngine, EngineEvent};
pub use error::{Error, Result};
pub use registry::ClientRegistry;
pub use report::{BatchReport, ConvergenceResult, Status};
pub use resource::{DesiredState, Ensure, ObservedState, Properties};
pub use traits::{ResourceClient, ResourceClientFactory};
