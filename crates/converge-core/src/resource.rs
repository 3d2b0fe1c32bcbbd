//! Desired- and observed-state types
//!
//! A [`DesiredState`] is what the caller wants the remote system to hold
//! (or not hold, for absence). An [`ObservedState`] is what the remote
//! system actually holds at query time. The engine never caches observed
//! state across calls: the remote system is authoritative and every
//! convergence call queries it fresh.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Property mapping for a resource (property name → value)
///
/// Ordered so that change reports iterate deterministically.
pub type Properties = BTreeMap<String, Value>;

/// A named resource declaration, immutable once passed to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredState {
    /// Unique identifier within its resource type and scope
    pub name: String,

    /// Discriminator selecting which resource client handles this resource
    pub resource_type: String,

    /// Desired property values
    #[serde(default)]
    pub properties: Properties,
}

impl DesiredState {
    /// Create a new declaration with no properties
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            properties: Properties::new(),
        }
    }

    /// Add a desired property value
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Check the declaration against the engine contract
    ///
    /// An empty name is a programming error in the caller, not a
    /// reportable convergence outcome, so it is the one fatal path.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::invalid_declaration(
                "resource name cannot be empty",
            ));
        }
        if self.resource_type.is_empty() {
            return Err(crate::Error::invalid_declaration(format!(
                "resource {} has an empty resource type",
                self.name
            )));
        }
        Ok(())
    }
}

/// The remote representation of a resource at query time, or absence thereof
///
/// Identity and properties only exist for a present resource, so absence
/// is a variant rather than a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedState {
    /// The resource genuinely does not exist remotely
    Absent,

    /// The resource exists remotely
    Present {
        /// Opaque remote-assigned identifier
        identity: String,
        /// Current remote property values
        properties: Properties,
    },
}

impl ObservedState {
    /// Whether the resource exists remotely
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// The remote identity, if the resource exists
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Present { identity, .. } => Some(identity),
            Self::Absent => None,
        }
    }

    /// The remote properties, if the resource exists
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            Self::Present { properties, .. } => Some(properties),
            Self::Absent => None,
        }
    }
}

/// Which side of the present/absent duality a declaration asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// The resource must exist with the declared properties
    #[default]
    Present,
    /// The resource must not exist
    Absent,
}
