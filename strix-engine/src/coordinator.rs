//! Per-job pipeline sequencing
//!
//! # Stage progression
//! PENDING → ANALYZERS_RUNNING → ANALYZERS_COMPLETED → CONNECTORS_RUNNING →
//! CONNECTORS_COMPLETED → VISUALIZERS_RUNNING → VISUALIZERS_COMPLETED →
//! (COMPLETED | FAILED)
//!
//! On entering a running status the coordinator submits one descriptor per
//! runnable plugin of that category, then one stage-transition descriptor
//! depending on all of them. The worker pool's dependency mechanism owns the
//! sequencing: when the siblings are done it executes the transition task,
//! whose handler calls back into [`JobPipelineCoordinator::set_pipeline_status`],
//! and the next stage starts. Pivots are dispatched opportunistically after
//! each completed stage and never block advancement.

use crate::db;
use crate::dispatch::TaskSignatureBuilder;
use crate::error::EngineError;
use crate::models::{Job, JobStatus, PluginKind, TaskReport};
use crate::registry::PluginConfigRegistry;
use crate::submit::Submitter;
use chrono::Utc;
use futures::future::join_all;
use sqlx::SqlitePool;
use std::sync::Arc;
use strix_common::events::{EventBus, StrixEvent};
use uuid::Uuid;

/// Sequences plugin categories for submitted jobs
pub struct JobPipelineCoordinator {
    pool: SqlitePool,
    registry: Arc<PluginConfigRegistry>,
    builder: TaskSignatureBuilder,
    submitter: Arc<dyn Submitter>,
    events: EventBus,
}

impl JobPipelineCoordinator {
    pub fn new(
        pool: SqlitePool,
        registry: Arc<PluginConfigRegistry>,
        builder: TaskSignatureBuilder,
        submitter: Arc<dyn Submitter>,
        events: EventBus,
    ) -> Self {
        Self {
            pool,
            registry,
            builder,
            submitter,
            events,
        }
    }

    /// Accept a job and start its first stage
    ///
    /// Returns the job with its updated status. The analyzers stage is
    /// dispatched before this returns; everything after that is driven by
    /// worker-pool callbacks.
    pub async fn submit(&self, mut job: Job) -> Result<Job, EngineError> {
        tracing::info!(
            job_id = %job.id,
            observable = %job.observable,
            user = ?job.user,
            "Job submitted"
        );
        db::jobs::save_job(&self.pool, &job).await?;
        self.events.emit_lossy(StrixEvent::JobSubmitted {
            job_id: job.id,
            observable: job.observable.clone(),
            timestamp: Utc::now(),
        });

        self.start_stage(
            &mut job,
            PluginKind::Analyzer,
            JobStatus::AnalyzersRunning,
            JobStatus::AnalyzersCompleted,
        )
        .await?;
        Ok(job)
    }

    /// Advance a job's pipeline status
    ///
    /// Called by the worker adapter when the pool executes a
    /// stage-transition descriptor. Completed-stage statuses trigger the
    /// next stage; a terminal job ignores late transitions.
    pub async fn set_pipeline_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<(), EngineError> {
        let mut job = db::jobs::load_job(&self.pool, job_id)
            .await?
            .ok_or(EngineError::JobNotFound(job_id))?;

        if job.is_terminal() {
            tracing::debug!(job_id = %job_id, status = %status, "Job already terminal, transition ignored");
            return Ok(());
        }

        if status == JobStatus::Failed {
            return self.fail(job_id, "failed by worker pool").await;
        }

        job.transition_to(status)?;
        db::jobs::update_status(&self.pool, job.id, job.status).await?;

        match status {
            JobStatus::AnalyzersCompleted => {
                self.stage_completed(&job, status);
                self.dispatch_pivots(&job).await;
                self.start_stage(
                    &mut job,
                    PluginKind::Connector,
                    JobStatus::ConnectorsRunning,
                    JobStatus::ConnectorsCompleted,
                )
                .await?;
            }
            JobStatus::ConnectorsCompleted => {
                self.stage_completed(&job, status);
                self.dispatch_pivots(&job).await;
                self.start_stage(
                    &mut job,
                    PluginKind::Visualizer,
                    JobStatus::VisualizersRunning,
                    JobStatus::VisualizersCompleted,
                )
                .await?;
            }
            JobStatus::VisualizersCompleted => {
                self.stage_completed(&job, status);
                self.dispatch_pivots(&job).await;
                job.transition_to(JobStatus::Completed)?;
                db::jobs::update_status(&self.pool, job.id, job.status).await?;
                tracing::info!(job_id = %job.id, "Job completed");
                self.events.emit_lossy(StrixEvent::JobCompleted {
                    job_id: job.id,
                    timestamp: Utc::now(),
                });
            }
            // Running statuses carry no follow-up work of their own
            _ => {}
        }
        Ok(())
    }

    /// Record a task outcome reported by the worker pool
    ///
    /// Bookkeeping only: individual plugin failures never block stage
    /// advancement (that is the pool's dependency mechanism), and a failed
    /// job still accepts late reports for already-submitted tasks.
    pub async fn handle_report(&self, report: TaskReport) -> Result<(), EngineError> {
        db::reports::save_report(&self.pool, &report).await?;
        if report.status.is_terminal() {
            tracing::debug!(
                job_id = %report.job_id,
                plugin = %report.plugin,
                task_id = %report.task_id,
                status = %report.status,
                "Task finished"
            );
            self.events.emit_lossy(StrixEvent::TaskFinished {
                job_id: report.job_id,
                plugin: report.plugin.clone(),
                task_id: report.task_id,
                status: report.status,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Mark a job failed
    ///
    /// No new stage is dispatched afterwards; descriptors already handed to
    /// the pool are not recalled. The correlation id ties the generic
    /// user-visible failure to the detailed log records.
    pub async fn fail(&self, job_id: Uuid, reason: &str) -> Result<(), EngineError> {
        let mut job = db::jobs::load_job(&self.pool, job_id)
            .await?
            .ok_or(EngineError::JobNotFound(job_id))?;
        if job.is_terminal() {
            return Ok(());
        }
        self.fail_loaded(&mut job, reason).await
    }

    async fn fail_loaded(&self, job: &mut Job, reason: &str) -> Result<(), EngineError> {
        let correlation_id = Uuid::new_v4();
        job.transition_to(JobStatus::Failed)?;
        db::jobs::update_status(&self.pool, job.id, job.status).await?;
        tracing::error!(
            job_id = %job.id,
            correlation_id = %correlation_id,
            reason,
            "Job failed"
        );
        self.events.emit_lossy(StrixEvent::JobFailed {
            job_id: job.id,
            reason: reason.to_string(),
            correlation_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Enter a running status and dispatch its stage
    ///
    /// Every sibling descriptor is submitted before the transition
    /// descriptor, and the transition's dependency set is exactly the
    /// submitted siblings. A stage with nothing runnable submits a
    /// transition with an empty dependency set and completes immediately on
    /// the pool side.
    async fn start_stage(
        &self,
        job: &mut Job,
        kind: PluginKind,
        running: JobStatus,
        completed: JobStatus,
    ) -> Result<(), EngineError> {
        if job.is_terminal() {
            tracing::warn!(job_id = %job.id, stage = %kind, "Job terminal, stage not dispatched");
            return Ok(());
        }

        job.transition_to(running)?;
        db::jobs::update_status(&self.pool, job.id, job.status).await?;

        let plugins = self.registry.of_kind(kind);
        let mut submitted: Vec<Uuid> = Vec::new();
        let mut buildable = 0usize;

        for plugin in &plugins {
            match self.builder.build(&plugin.name, job).await {
                Ok(descriptor) => {
                    buildable += 1;
                    match self.submitter.submit(&descriptor).await {
                        Ok(()) => {
                            submitted.push(descriptor.task_id);
                            self.events.emit_lossy(StrixEvent::TaskSubmitted {
                                job_id: job.id,
                                plugin: plugin.name.clone(),
                                task_id: descriptor.task_id,
                                queue: descriptor.queue.clone(),
                                timestamp: Utc::now(),
                            });
                        }
                        Err(e) => {
                            tracing::warn!(
                                job_id = %job.id,
                                plugin = %plugin.name,
                                error = %e,
                                "Task submission failed"
                            );
                        }
                    }
                }
                Err(
                    e @ (EngineError::PluginNotRunnable { .. }
                    | EngineError::ParameterNotConfigured { .. }),
                ) => {
                    // Per-plugin rejection, structured and user-visible;
                    // the rest of the stage is unaffected
                    tracing::debug!(job_id = %job.id, plugin = %plugin.name, reason = %e, "Plugin skipped");
                    self.events.emit_lossy(StrixEvent::PluginRejected {
                        job_id: job.id,
                        plugin: plugin.name.clone(),
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // Nothing buildable is a legitimate empty stage; built-but-none-
        // submitted means the pool refused everything, which is fatal.
        if buildable > 0 && submitted.is_empty() {
            self.fail_loaded(job, "could not submit any task for the stage")
                .await?;
            return Ok(());
        }

        let transition = self
            .builder
            .build_stage_transition(job.id, completed, submitted.clone());
        if let Err(e) = self.submitter.submit(&transition).await {
            tracing::error!(job_id = %job.id, error = %e, "Stage transition submission failed");
            self.fail_loaded(job, "could not submit the stage transition")
                .await?;
            return Ok(());
        }

        tracing::info!(
            job_id = %job.id,
            stage = %kind,
            submitted = submitted.len(),
            skipped = plugins.len() - buildable,
            "Stage dispatched"
        );
        self.events.emit_lossy(StrixEvent::StageStarted {
            job_id: job.id,
            status: running,
            submitted: submitted.len(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Submit every runnable pivot for this job
    ///
    /// Pivots have no stage status and no transition descriptor; failures
    /// here are logged and swallowed. Builds run concurrently, the results
    /// are submitted in plugin-name order.
    async fn dispatch_pivots(&self, job: &Job) {
        let pivots = self.registry.of_kind(PluginKind::Pivot);
        let built = join_all(pivots.into_iter().map(|plugin| async move {
            let result = self.builder.build(&plugin.name, job).await;
            (plugin, result)
        }))
        .await;

        for (plugin, result) in built {
            match result {
                Ok(descriptor) => match self.submitter.submit(&descriptor).await {
                    Ok(()) => {
                        self.events.emit_lossy(StrixEvent::TaskSubmitted {
                            job_id: job.id,
                            plugin: plugin.name.clone(),
                            task_id: descriptor.task_id,
                            queue: descriptor.queue.clone(),
                            timestamp: Utc::now(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %job.id, plugin = %plugin.name, error = %e, "Pivot submission failed");
                    }
                },
                Err(e) => {
                    tracing::debug!(job_id = %job.id, plugin = %plugin.name, reason = %e, "Pivot skipped");
                }
            }
        }
    }

    fn stage_completed(&self, job: &Job, status: JobStatus) {
        tracing::info!(job_id = %job.id, status = %status, "Stage completed");
        self.events.emit_lossy(StrixEvent::StageCompleted {
            job_id: job.id,
            status,
            timestamp: Utc::now(),
        });
    }
}
