//! Per-task execution reports
//!
//! Workers produce one report per task attempt; the coordinator only
//! consumes terminal ones. Individual failures are recorded here and never
//! block stage advancement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strix_common::events::ReportStatus;
use uuid::Uuid;

/// Outcome record of one plugin execution attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: Uuid,
    pub job_id: Uuid,
    pub plugin: String,
    pub status: ReportStatus,
    pub errors: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TaskReport {
    pub fn new(task_id: Uuid, job_id: Uuid, plugin: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            job_id,
            plugin: plugin.into(),
            status: ReportStatus::Pending,
            errors: Vec::new(),
            start_time: now,
            end_time: now,
        }
    }

    /// Seconds between start and end, rounded to centiseconds
    pub fn process_time(&self) -> f64 {
        let secs = (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0;
        (secs * 100.0).round() / 100.0
    }

    pub fn append_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a terminal status and stamp the end time
    pub fn finish(&mut self, status: ReportStatus) {
        self.status = status;
        self.end_time = Utc::now();
    }
}
