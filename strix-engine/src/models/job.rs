//! Jobs and their status machine
//!
//! A job is the execution context for one submitted observable. Its status
//! walks `pending → analyzers_running → analyzers_completed →
//! connectors_running → connectors_completed → visualizers_running →
//! visualizers_completed → completed`, with `failed` reachable from any
//! non-terminal status.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strix_common::events::JobStatus;
use uuid::Uuid;

/// Per-plugin runtime overrides supplied with a job submission:
/// `plugin name -> { parameter name -> value }`
pub type RuntimeConfiguration = HashMap<String, HashMap<String, serde_json::Value>>;

/// One submitted analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,

    /// Requesting user; `None` for anonymous-allowed flows
    pub user: Option<Uuid>,

    /// What is being analyzed (IP, domain, file hash, ...). The dispatch
    /// core carries this opaquely; plugins interpret it.
    pub observable: String,
    pub observable_kind: String,

    /// Overrides take precedence over every stored parameter value
    #[serde(default)]
    pub runtime_configuration: RuntimeConfiguration,

    pub status: JobStatus,
    pub received_at: DateTime<Utc>,
}

impl Job {
    pub fn new(observable: impl Into<String>, kind: impl Into<String>, user: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            observable: observable.into(),
            observable_kind: kind.into(),
            runtime_configuration: HashMap::new(),
            status: JobStatus::Pending,
            received_at: Utc::now(),
        }
    }

    pub fn with_runtime_configuration(mut self, runtime: RuntimeConfiguration) -> Self {
        self.runtime_configuration = runtime;
        self
    }

    /// Runtime override for one parameter of one plugin, if supplied
    pub fn runtime_value(&self, plugin: &str, parameter: &str) -> Option<&serde_json::Value> {
        self.runtime_configuration.get(plugin)?.get(parameter)
    }

    /// Overrides for one plugin, as echoed into task descriptors
    pub fn runtime_for(&self, plugin: &str) -> HashMap<String, serde_json::Value> {
        self.runtime_configuration
            .get(plugin)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move the status forward
    ///
    /// Only forward moves are valid; `Failed` is accepted from any
    /// non-terminal status. A terminal job accepts no transition at all.
    pub fn transition_to(&mut self, new_status: JobStatus) -> Result<(), EngineError> {
        let invalid = || EngineError::InvalidTransition {
            from: self.status,
            to: new_status,
        };

        if self.status.is_terminal() {
            return Err(invalid());
        }
        if new_status != JobStatus::Failed && new_status.ordinal() <= self.status.ordinal() {
            return Err(invalid());
        }

        tracing::debug!(
            job_id = %self.id,
            from = %self.status,
            to = %new_status,
            "Job status transition"
        );
        self.status = new_status;
        Ok(())
    }
}
