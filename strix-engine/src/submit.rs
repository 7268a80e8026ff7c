//! Worker-pool submission seam
//!
//! The concrete queue client (AMQP, Redis, SQS, ...) is an adapter outside
//! the core; the engine only depends on this trait. The pool guarantees
//! at-least-once delivery with at-most-one concurrent execution per
//! idempotency token, and reports terminal outcomes back through
//! [`crate::coordinator::JobPipelineCoordinator::handle_report`].

use crate::error::EngineError;
use crate::models::TaskDescriptor;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Accepts task descriptors for asynchronous execution
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Hand one descriptor to the worker pool
    ///
    /// Submission is fire-and-forget; a submitted descriptor cannot be
    /// recalled by this core.
    async fn submit(&self, descriptor: &TaskDescriptor) -> Result<(), EngineError>;
}

/// Submitter that records descriptors in submission order
///
/// The in-memory double used by tests and by local single-process
/// deployments that drain the recorded queue themselves.
#[derive(Default)]
pub struct RecordingSubmitter {
    submitted: Mutex<Vec<TaskDescriptor>>,
    failing: AtomicBool,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, in order
    pub fn submitted(&self) -> Vec<TaskDescriptor> {
        self.submitted.lock().expect("submitter lock poisoned").clone()
    }

    /// Make every subsequent submission fail, simulating a worker-pool
    /// outage
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(&self, descriptor: &TaskDescriptor) -> Result<(), EngineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Submit("worker pool unavailable".to_string()));
        }
        self.submitted
            .lock()
            .expect("submitter lock poisoned")
            .push(descriptor.clone());
        Ok(())
    }
}
