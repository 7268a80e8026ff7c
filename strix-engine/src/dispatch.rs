//! Task signature building
//!
//! Turns a runnable plugin plus a job into an immutable [`TaskDescriptor`]
//! ready for the worker pool, and builds the lightweight stage-transition
//! descriptors that sequence the pipeline.

use crate::error::EngineError;
use crate::handlers::PIPELINE_STATUS_ENTRY_POINT;
use crate::models::{Job, JobStatus, TaskArgs, TaskDescriptor};
use crate::registry::PluginConfigRegistry;
use crate::resolver::ParameterResolver;
use std::sync::Arc;
use strix_common::config::EngineSettings;
use uuid::Uuid;

/// Builds executable task descriptors
#[derive(Clone)]
pub struct TaskSignatureBuilder {
    registry: Arc<PluginConfigRegistry>,
    resolver: ParameterResolver,
    settings: EngineSettings,
}

impl TaskSignatureBuilder {
    pub fn new(
        registry: Arc<PluginConfigRegistry>,
        resolver: ParameterResolver,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            resolver,
            settings,
        }
    }

    /// Build the descriptor for one plugin execution
    ///
    /// Fails with [`EngineError::PluginNotRunnable`] unless the plugin is
    /// currently runnable for the job's user. Every call generates a fresh
    /// idempotency token, including retries of the same plugin/job pair:
    /// each retry is a new attempt the pool deduplicates independently.
    pub async fn build(&self, plugin_name: &str, job: &Job) -> Result<TaskDescriptor, EngineError> {
        let plugin = self
            .registry
            .get(plugin_name)
            .ok_or_else(|| EngineError::PluginNotFound(plugin_name.to_string()))?;

        if let Some(reason) = self.registry.reject_reason(&plugin, job.user).await? {
            return Err(EngineError::PluginNotRunnable {
                plugin: plugin.name,
                reason,
            });
        }

        let params = self.resolver.read_params(&plugin, job).await?;
        let task_id = Uuid::new_v4();

        // The registry already substituted an invalid queue at registration,
        // but settings may have been reloaded since; re-check at dispatch
        // time with the same fallback policy.
        let queue = if self.settings.queue.is_valid(&plugin.queue) {
            plugin.queue.clone()
        } else {
            tracing::warn!(
                plugin = %plugin.name,
                queue = %plugin.queue,
                fallback = %self.settings.queue.default_queue,
                "Configured queue no longer valid at dispatch, falling back to the default"
            );
            self.settings.queue.default_queue.clone()
        };

        tracing::debug!(
            job_id = %job.id,
            plugin = %plugin.name,
            task_id = %task_id,
            queue = %queue,
            "Built task descriptor"
        );

        Ok(TaskDescriptor {
            task_id,
            job_id: job.id,
            entry_point: plugin.entry_point.clone(),
            args: TaskArgs::RunPlugin {
                job_id: job.id,
                plugin: plugin.name.clone(),
                params,
                runtime_configuration: job.runtime_for(&plugin.name).into_iter().collect(),
            },
            queue,
            soft_time_limit: plugin.soft_time_limit,
            message_group: task_id.to_string(),
            dependencies: Vec::new(),
        })
    }

    /// Build a stage-transition descriptor
    ///
    /// Its sole effect, when the worker pool executes it, is advancing the
    /// job to `target_status`. The pool holds it back until every token in
    /// `dependencies` reached a terminal state, which is how stage
    /// sequencing happens without the dispatcher polling.
    pub fn build_stage_transition(
        &self,
        job_id: Uuid,
        target_status: JobStatus,
        dependencies: Vec<Uuid>,
    ) -> TaskDescriptor {
        let task_id = Uuid::new_v4();
        TaskDescriptor {
            task_id,
            job_id,
            entry_point: PIPELINE_STATUS_ENTRY_POINT.to_string(),
            args: TaskArgs::SetPipelineStatus {
                job_id,
                status: target_status,
            },
            queue: self.settings.queue.default_queue.clone(),
            soft_time_limit: self.settings.task.transition_soft_time_limit,
            message_group: Uuid::new_v4().to_string(),
            dependencies,
        }
    }
}
