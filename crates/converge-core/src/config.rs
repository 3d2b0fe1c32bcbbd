//! Configuration types for the convergence system
//!
//! This module defines all configuration structures used throughout the
//! crate. Configuration is an explicit struct constructed at
//! initialization and passed into whichever component needs it; there is
//! no ambient global state, and the dry-run flag lives here rather than
//! in a process-wide options map.

use crate::resource::{DesiredState, Ensure, Properties};
use serde::{Deserialize, Serialize};

/// Main convergence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergeConfig {
    /// Resource clients, one per managed resource type
    pub clients: Vec<ClientConfig>,

    /// Resource declarations to converge
    pub resources: Vec<ResourceConfig>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ConvergeConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
            resources: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Parse a configuration from a JSON string
    pub fn from_str(raw: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(raw)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_str(&raw)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resources.is_empty() {
            return Err(crate::Error::config("no resources configured"));
        }

        for client in &self.clients {
            client.validate()?;
        }

        for resource in &self.resources {
            resource.validate()?;
            if !self
                .clients
                .iter()
                .any(|c| c.resource_type == resource.resource_type)
            {
                return Err(crate::Error::config(format!(
                    "resource {} declares type {} but no client is configured for it",
                    resource.name, resource.resource_type
                )));
            }
        }

        Ok(())
    }
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for one resource client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The resource type this client serves
    pub resource_type: String,

    /// Which backend implementation to use
    #[serde(flatten)]
    pub backend: ClientBackend,
}

impl ClientConfig {
    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resource_type.is_empty() {
            return Err(crate::Error::config("client resource type cannot be empty"));
        }
        self.backend.validate()
    }
}

/// Resource client backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ClientBackend {
    /// Generic JSON-over-HTTP resource API
    Http {
        /// Base URL of the resource collection endpoint
        base_url: String,
        /// Bearer token for authentication (optional)
        api_token: Option<String>,
        /// Request timeout in seconds (optional, client default applies)
        timeout_secs: Option<u64>,
    },

    /// In-memory client (not persistent; testing and local runs)
    Memory,

    /// Custom client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ClientBackend {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ClientBackend::Http { base_url, .. } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("HTTP client base URL cannot be empty"));
                }
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "HTTP client base URL must use http or https: {}",
                        base_url
                    )));
                }
                Ok(())
            }
            ClientBackend::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("custom client factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("custom client config cannot be null"));
                }
                Ok(())
            }
            ClientBackend::Memory => Ok(()),
        }
    }

    /// Get the backend type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            ClientBackend::Http { .. } => "http",
            ClientBackend::Memory => "memory",
            ClientBackend::Custom { factory, .. } => factory,
        }
    }
}

/// One declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource name, unique within its resource type
    pub name: String,

    /// Resource type selecting the client
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Present or absent
    #[serde(default)]
    pub ensure: Ensure,

    /// Desired property values (ignored for absent declarations)
    #[serde(default)]
    pub properties: Properties,

    /// Whether this declaration is converged during batch apply
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ResourceConfig {
    /// Create a new present declaration
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            ensure: Ensure::Present,
            properties: Properties::new(),
            enabled: true,
        }
    }

    /// Set the ensure mode
    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    /// Add a desired property value
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Enable or disable the declaration
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validate the declaration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.desired().validate()
    }

    /// View this declaration as the engine's desired-state input
    pub fn desired(&self) -> DesiredState {
        DesiredState {
            name: self.name.clone(),
            resource_type: self.resource_type.clone(),
            properties: self.properties.clone(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default dry-run policy for batch apply
    ///
    /// When true, no mutating client call is made during `apply`; every
    /// result is a prediction. Individual `ensure_present`/`ensure_absent`
    /// calls take the flag explicitly.
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the internal event channel
    ///
    /// When full, new engine events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    256
}
