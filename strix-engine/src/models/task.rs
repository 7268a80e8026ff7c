//! Task descriptors handed to the worker pool

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strix_common::events::JobStatus;
use uuid::Uuid;

/// Payload the worker hands to the target handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TaskArgs {
    /// Execute one plugin against a job
    RunPlugin {
        job_id: Uuid,
        plugin: String,
        /// Resolved parameter map, precedence already applied
        params: BTreeMap<String, serde_json::Value>,
        /// Echo of the job's runtime overrides for this plugin, kept so the
        /// worker can log the provenance of overridden values
        runtime_configuration: BTreeMap<String, serde_json::Value>,
    },
    /// Advance the job's pipeline status; sole effect of a stage-transition
    /// descriptor
    SetPipelineStatus { job_id: Uuid, status: JobStatus },
}

/// One unit of work for the worker pool, immutable once built
///
/// `task_id` is the idempotency token: fresh per build, never reused, so the
/// pool can deduplicate per attempt. `dependencies` lists tokens this task
/// waits on; the pool's dependency mechanism owns the sequencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: Uuid,
    pub job_id: Uuid,
    /// Handler-registry key of the execution unit to run
    pub entry_point: String,
    pub args: TaskArgs,
    pub queue: String,
    /// Seconds; enforced by the worker pool, not by this core
    pub soft_time_limit: u64,
    /// FIFO grouping key for ordered queue backends
    pub message_group: String,
    pub dependencies: Vec<Uuid>,
}

impl TaskDescriptor {
    /// Whether this descriptor only flips a pipeline status
    pub fn is_stage_transition(&self) -> bool {
        matches!(self.args, TaskArgs::SetPipelineStatus { .. })
    }
}
