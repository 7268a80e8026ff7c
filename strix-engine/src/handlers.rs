//! Compiled-in execution units
//!
//! Plugins name their execution unit by an entry-point string; the string is
//! a key into this static registry, populated at startup. There is no
//! reflection or dynamic loading: an entry point either maps to a handler
//! compiled into the worker binary, or the plugin is rejected at
//! registration.

use crate::models::TaskArgs;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Entry point of the built-in stage-transition handler
pub const PIPELINE_STATUS_ENTRY_POINT: &str = "job.set_pipeline_status";

/// Anything that can say what it is
pub trait Describable {
    /// Registry key, e.g. `"analyzers.shodan"`
    fn entry_point(&self) -> &'static str;

    fn describe(&self) -> &'static str {
        ""
    }
}

/// A handler the worker pool can execute
///
/// Handlers run inside worker processes, never inside the dispatch core;
/// the core only needs to know they exist.
#[async_trait]
pub trait Runnable: Describable + Send + Sync {
    /// Execute against the task payload, returning the report body
    async fn run(&self, args: &TaskArgs) -> Result<serde_json::Value>;
}

/// Static mapping from entry-point string to compiled-in handler
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn Runnable>>,
}

impl HandlerRegistry {
    /// Empty registry; most callers want [`with_builtins`](Self::with_builtins)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the engine's own handlers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PipelineStatusHandler));
        registry
    }

    /// Register a handler under its entry point; replaces a previous handler
    /// with the same key
    pub fn register(&mut self, handler: Arc<dyn Runnable>) {
        let entry_point = handler.entry_point();
        if self.handlers.insert(entry_point, handler).is_some() {
            tracing::warn!(entry_point, "Handler replaced an existing registration");
        }
    }

    pub fn get(&self, entry_point: &str) -> Option<Arc<dyn Runnable>> {
        self.handlers.get(entry_point).cloned()
    }

    pub fn contains(&self, entry_point: &str) -> bool {
        self.handlers.contains_key(entry_point)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Built-in handler backing stage-transition descriptors
///
/// Executing it is the worker pool's way of telling the coordinator that a
/// stage finished; the worker adapter forwards the payload to
/// [`crate::coordinator::JobPipelineCoordinator::set_pipeline_status`].
pub struct PipelineStatusHandler;

impl Describable for PipelineStatusHandler {
    fn entry_point(&self) -> &'static str {
        PIPELINE_STATUS_ENTRY_POINT
    }

    fn describe(&self) -> &'static str {
        "advance a job's pipeline status"
    }
}

#[async_trait]
impl Runnable for PipelineStatusHandler {
    async fn run(&self, args: &TaskArgs) -> Result<serde_json::Value> {
        match args {
            TaskArgs::SetPipelineStatus { job_id, status } => Ok(serde_json::json!({
                "job_id": job_id,
                "status": status,
            })),
            TaskArgs::RunPlugin { .. } => {
                anyhow::bail!("pipeline status handler received a plugin payload")
            }
        }
    }
}
