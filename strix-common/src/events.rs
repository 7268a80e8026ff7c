//! Event types for the Strix event system
//!
//! Provides shared event definitions and the EventBus used by the dispatch
//! core and by the surrounding services (API frontend, worker processes).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline status of a job
///
/// A job walks the stages in order; pivots run between stages and have no
/// status of their own. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    AnalyzersRunning,
    AnalyzersCompleted,
    ConnectorsRunning,
    ConnectorsCompleted,
    VisualizersRunning,
    VisualizersCompleted,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the forward progression, used to reject backwards moves.
    pub fn ordinal(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::AnalyzersRunning => 1,
            JobStatus::AnalyzersCompleted => 2,
            JobStatus::ConnectorsRunning => 3,
            JobStatus::ConnectorsCompleted => 4,
            JobStatus::VisualizersRunning => 5,
            JobStatus::VisualizersCompleted => 6,
            JobStatus::Completed => 7,
            JobStatus::Failed => 7,
        }
    }

    /// Whether the job is finished (no further stage may be dispatched)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Stable string form, also used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::AnalyzersRunning => "analyzers_running",
            JobStatus::AnalyzersCompleted => "analyzers_completed",
            JobStatus::ConnectorsRunning => "connectors_running",
            JobStatus::ConnectorsCompleted => "connectors_completed",
            JobStatus::VisualizersRunning => "visualizers_running",
            JobStatus::VisualizersCompleted => "visualizers_completed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse the persisted string form
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => JobStatus::Pending,
            "analyzers_running" => JobStatus::AnalyzersRunning,
            "analyzers_completed" => JobStatus::AnalyzersCompleted,
            "connectors_running" => JobStatus::ConnectorsRunning,
            "connectors_completed" => JobStatus::ConnectorsCompleted,
            "visualizers_running" => JobStatus::VisualizersRunning,
            "visualizers_completed" => JobStatus::VisualizersCompleted,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => return None,
        })
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal/non-terminal state of one plugin execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Running,
    Success,
    Failed,
    Killed,
}

impl ReportStatus {
    /// Success, Failed and Killed are terminal; the worker pool reports
    /// exactly one of them per task attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportStatus::Success | ReportStatus::Failed | ReportStatus::Killed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Running => "running",
            ReportStatus::Success => "success",
            ReportStatus::Failed => "failed",
            ReportStatus::Killed => "killed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => ReportStatus::Pending,
            "running" => ReportStatus::Running,
            "success" => ReportStatus::Success,
            "failed" => ReportStatus::Failed,
            "killed" => ReportStatus::Killed,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strix event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission by the web frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StrixEvent {
    /// Job accepted and persisted, pipeline about to start
    JobSubmitted {
        job_id: Uuid,
        /// The observable under analysis (IP, domain, hash, ...)
        observable: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline stage entered its running status
    StageStarted {
        job_id: Uuid,
        status: JobStatus,
        /// Number of task descriptors submitted for the stage
        submitted: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One task descriptor was handed to the worker pool
    TaskSubmitted {
        job_id: Uuid,
        plugin: String,
        task_id: Uuid,
        queue: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A plugin was skipped for this job with a structured reason
    ///
    /// Surfaced to the submitter as a user-visible rejection; never retried.
    PluginRejected {
        job_id: Uuid,
        plugin: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The worker pool reported a terminal state for one task
    TaskFinished {
        job_id: Uuid,
        plugin: String,
        task_id: Uuid,
        status: ReportStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All tasks of a stage reached a terminal state
    StageCompleted {
        job_id: Uuid,
        status: JobStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every stage completed
    JobCompleted {
        job_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The job was aborted; `correlation_id` ties the generic user-visible
    /// failure to the detailed log records
    JobFailed {
        job_id: Uuid,
        reason: String,
        correlation_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StrixEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Older events are dropped once the buffer is full; lagged subscribers
    /// observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StrixEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscriber is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StrixEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<StrixEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Dispatch never depends on observers being present.
    pub fn emit_lossy(&self, event: StrixEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("No subscribers for event: {:?}", e.0);
        }
    }
}
