//! Core convergence engine
//!
//! The ConvergenceEngine is responsible for:
//! - Querying current remote state via a ResourceClient
//! - Computing the required action (none / create / delete / update)
//! - Performing at most one mutating call, or predicting it under dry-run
//! - Translating the outcome into a ConvergenceResult
//!
//! ## Per-call state machine
//!
//! ```text
//! START → QUERIED → ┬─ NO_OP
//!                   ├─ DRY_RUN_PREDICTED
//!                   └─ MUTATING → ┬─ SUCCEEDED
//!                                 └─ FAILED
//! ```
//!
//! Every invocation restarts at START; no state persists between calls.
//! The engine holds no mutable fields of its own; it is a pure function
//! of its inputs plus the remote state behind the client.
//!
//! ## Failure semantics
//!
//! Client errors are never retried and never raised to the caller: they
//! become `Failed` results whose message preserves the original error
//! text, tagged with the name of the client that produced it. A failed
//! `get` is reported as a query failure, never collapsed into "absent".
//! Only declaration-contract violations (empty name) return `Err`.

use crate::config::EngineConfig;
use crate::report::{BatchReport, ConvergenceResult};
use crate::resource::{DesiredState, Ensure, ObservedState, Properties};
use crate::traits::ResourceClient;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the ConvergenceEngine
///
/// Mirrors the per-call state machine for external monitoring. Events are
/// best-effort: when the channel is full they are dropped with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Current state was observed
    Queried {
        name: String,
        exists: bool,
    },

    /// Remote already matched the declaration
    NoOp {
        name: String,
    },

    /// Dry-run suppressed a mutation; outcome predicted
    Predicted {
        name: String,
    },

    /// A mutating client call is about to run
    MutationStarted {
        name: String,
    },

    /// The mutating call succeeded
    MutationSucceeded {
        name: String,
    },

    /// The mutating call failed
    MutationFailed {
        name: String,
        error: String,
    },

    /// Current state could not be determined
    QueryFailed {
        name: String,
        error: String,
    },

    /// Batch apply started
    BatchStarted {
        resources_count: usize,
        dry_run: bool,
    },

    /// Batch apply finished
    BatchFinished {
        failed_count: usize,
    },
}

/// Core convergence engine
///
/// Clients are resolved once at startup (see
/// [`ClientRegistry::resolve`](crate::registry::ClientRegistry::resolve))
/// and handed to the engine as a resource-type → client map. Each
/// `ensure_present`/`ensure_absent` call performs at most one query and at
/// most one mutating call, sequentially, and blocks its caller until done.
///
/// ## Concurrency
///
/// The engine provides no mutual exclusion between concurrent calls for
/// the same resource name; last-mutation-wins is decided by the remote
/// system. Callers needing at-most-one-in-flight-per-name serialize
/// externally.
pub struct ConvergenceEngine {
    /// Resolved clients, keyed by resource type
    clients: HashMap<String, Box<dyn ResourceClient>>,

    /// Default dry-run policy for batch apply
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ConvergenceEngine {
    /// Create a new convergence engine
    ///
    /// # Parameters
    ///
    /// - `clients`: resolved resource clients, keyed by resource type
    /// - `config`: engine configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        clients: HashMap<String, Box<dyn ResourceClient>>,
        config: EngineConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

        let engine = Self {
            clients,
            dry_run: config.dry_run,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Look up the resolved client for a resource type
    pub fn client_for(&self, resource_type: &str) -> Option<&dyn ResourceClient> {
        self.clients.get(resource_type).map(|c| c.as_ref())
    }

    /// Ensure a resource exists with the declared properties
    ///
    /// Performs one `get`, then at most one `create` (or `update`, for
    /// clients that support it). Under dry-run no mutating call is made
    /// and the result carries the predicted change set.
    ///
    /// Returns `Err` only if the declaration violates the engine contract;
    /// every client failure is reported through the result.
    pub async fn ensure_present(
        &self,
        desired: &DesiredState,
        client: &dyn ResourceClient,
        dry_run: bool,
    ) -> Result<ConvergenceResult, crate::Error> {
        desired.validate()?;
        let name = desired.name.as_str();

        let observed = match client.get(name).await {
            Ok(observed) => observed,
            Err(e) => {
                let e = crate::Error::client(client.client_name(), e.to_string());
                return Ok(self.query_failed(name, &e));
            }
        };
        self.emit_event(EngineEvent::Queried {
            name: name.to_string(),
            exists: observed.exists(),
        });

        match observed {
            ObservedState::Absent => {
                if dry_run {
                    debug!("{} is absent, create suppressed by dry-run", name);
                    self.emit_event(EngineEvent::Predicted {
                        name: name.to_string(),
                    });
                    return Ok(ConvergenceResult::predicted(
                        name,
                        desired.properties.clone(),
                        format!("{} will be created", name),
                    ));
                }

                self.emit_event(EngineEvent::MutationStarted {
                    name: name.to_string(),
                });
                match client.create(name, &desired.properties).await {
                    Ok(applied) => {
                        info!("created {} via {}", name, client.client_name());
                        self.emit_event(EngineEvent::MutationSucceeded {
                            name: name.to_string(),
                        });
                        // Prefer the change set the client reports; a
                        // successful create never reports an empty one.
                        let changed = if applied.is_empty() {
                            desired.properties.clone()
                        } else {
                            applied
                        };
                        Ok(ConvergenceResult::applied(
                            name,
                            changed,
                            format!("Created {}", name),
                        ))
                    }
                    Err(e) => {
                        let e = crate::Error::client(client.client_name(), e.to_string());
                        Ok(self.mutation_failed(name, format!("creating {} failed: {}", name, e)))
                    }
                }
            }
            ObservedState::Present {
                identity,
                properties,
            } => {
                if !client.supports_update() {
                    // Many resource types are immutable in place; existing
                    // means converged.
                    debug!("{} already present, {} has no update support", name, client.client_name());
                    self.emit_event(EngineEvent::NoOp {
                        name: name.to_string(),
                    });
                    return Ok(ConvergenceResult::no_op(
                        name,
                        format!("{} already present", name),
                    ));
                }

                let delta = property_delta(&properties, &desired.properties);
                if delta.is_empty() {
                    debug!("{} already matches desired properties", name);
                    self.emit_event(EngineEvent::NoOp {
                        name: name.to_string(),
                    });
                    return Ok(ConvergenceResult::no_op(
                        name,
                        format!("{} already present", name),
                    ));
                }

                if dry_run {
                    debug!("{} differs in {} properties, update suppressed by dry-run", name, delta.len());
                    self.emit_event(EngineEvent::Predicted {
                        name: name.to_string(),
                    });
                    return Ok(ConvergenceResult::predicted(
                        name,
                        delta,
                        format!("{} will be updated", name),
                    ));
                }

                self.emit_event(EngineEvent::MutationStarted {
                    name: name.to_string(),
                });
                match client.update(&identity, &delta).await {
                    Ok(applied) => {
                        info!("updated {} via {}", name, client.client_name());
                        self.emit_event(EngineEvent::MutationSucceeded {
                            name: name.to_string(),
                        });
                        let changed = if applied.is_empty() { delta } else { applied };
                        Ok(ConvergenceResult::applied(
                            name,
                            changed,
                            format!("Updated {}", name),
                        ))
                    }
                    Err(e) => {
                        let e = crate::Error::client(client.client_name(), e.to_string());
                        Ok(self.mutation_failed(name, format!("updating {} failed: {}", name, e)))
                    }
                }
            }
        }
    }

    /// Ensure a resource does not exist
    ///
    /// Performs one `get`, then at most one `delete`. Under dry-run no
    /// mutating call is made.
    pub async fn ensure_absent(
        &self,
        desired: &DesiredState,
        client: &dyn ResourceClient,
        dry_run: bool,
    ) -> Result<ConvergenceResult, crate::Error> {
        desired.validate()?;
        let name = desired.name.as_str();

        let observed = match client.get(name).await {
            Ok(observed) => observed,
            Err(e) => {
                let e = crate::Error::client(client.client_name(), e.to_string());
                return Ok(self.query_failed(name, &e));
            }
        };
        self.emit_event(EngineEvent::Queried {
            name: name.to_string(),
            exists: observed.exists(),
        });

        let ObservedState::Present { identity, .. } = observed else {
            debug!("{} is not present, nothing to delete", name);
            self.emit_event(EngineEvent::NoOp {
                name: name.to_string(),
            });
            return Ok(ConvergenceResult::no_op(
                name,
                format!("{} is not present", name),
            ));
        };

        if dry_run {
            debug!("{} exists as {}, delete suppressed by dry-run", name, identity);
            self.emit_event(EngineEvent::Predicted {
                name: name.to_string(),
            });
            let mut changed = Properties::new();
            changed.insert(name.to_string(), identity.into());
            return Ok(ConvergenceResult::predicted(
                name,
                changed,
                format!("{} will be deleted", name),
            ));
        }

        self.emit_event(EngineEvent::MutationStarted {
            name: name.to_string(),
        });
        match client.delete(&identity).await {
            Ok(()) => {
                info!("deleted {} ({}) via {}", name, identity, client.client_name());
                self.emit_event(EngineEvent::MutationSucceeded {
                    name: name.to_string(),
                });
                let mut changed = Properties::new();
                changed.insert("id".to_string(), identity.into());
                Ok(ConvergenceResult::applied(
                    name,
                    changed,
                    format!("Deleted {}", name),
                ))
            }
            Err(e) => {
                let e = crate::Error::client(client.client_name(), e.to_string());
                Ok(self.mutation_failed(name, format!("deleting {} failed: {}", name, e)))
            }
        }
    }

    /// Converge a batch of declarations sequentially
    ///
    /// Uses the configured dry-run default. An unknown resource type
    /// yields a `Failed` result for that declaration; the batch continues
    /// past every failure. Disabled declarations are skipped entirely.
    pub async fn apply(
        &self,
        declarations: &[crate::config::ResourceConfig],
    ) -> Result<BatchReport, crate::Error> {
        self.emit_event(EngineEvent::BatchStarted {
            resources_count: declarations.len(),
            dry_run: self.dry_run,
        });

        let mut report = BatchReport::new();
        for declaration in declarations {
            if !declaration.enabled {
                debug!("resource {} is disabled, skipping", declaration.name);
                continue;
            }

            let desired = declaration.desired();
            let Some(client) = self.client_for(&desired.resource_type) else {
                warn!(
                    "no client resolved for resource type {}",
                    desired.resource_type
                );
                report.push(ConvergenceResult::failed(
                    &desired.name,
                    format!("no client for resource type {}", desired.resource_type),
                ));
                continue;
            };

            let result = match declaration.ensure {
                Ensure::Present => self.ensure_present(&desired, client, self.dry_run).await?,
                Ensure::Absent => self.ensure_absent(&desired, client, self.dry_run).await?,
            };
            report.push(result);
        }

        self.emit_event(EngineEvent::BatchFinished {
            failed_count: report.failed_count(),
        });

        Ok(report)
    }

    /// Build the result for a failed `get`
    ///
    /// A query failure must stay distinguishable from genuine absence, so
    /// the message names the query step.
    fn query_failed(&self, name: &str, error: &crate::Error) -> ConvergenceResult {
        warn!("querying {} failed: {}", name, error);
        self.emit_event(EngineEvent::QueryFailed {
            name: name.to_string(),
            error: error.to_string(),
        });
        ConvergenceResult::failed(name, format!("querying {} failed: {}", name, error))
    }

    /// Build the result for a failed mutating call
    fn mutation_failed(&self, name: &str, message: String) -> ConvergenceResult {
        warn!("{}", message);
        self.emit_event(EngineEvent::MutationFailed {
            name: name.to_string(),
            error: message.clone(),
        });
        ConvergenceResult::failed(name, message)
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging a warning if the channel is full. Dropping
        // is acceptable: events are monitoring signal, not state.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping event");
        }
    }
}

/// Compute the property delta between observed and desired state
///
/// The delta contains every desired entry whose observed value differs or
/// is missing. Observed properties not mentioned in the declaration are
/// left alone; convergence applies the minimal necessary mutation.
fn property_delta(observed: &Properties, desired: &Properties) -> Properties {
    desired
        .iter()
        .filter(|(key, value)| observed.get(*key) != Some(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
