//! Core traits for the convergence system
//!
//! This module defines the capability interface the engine depends on.
//!
//! - [`ResourceClient`]: query and mutate one remote resource type

pub mod resource_client;

pub use resource_client::{ResourceClient, ResourceClientFactory};
