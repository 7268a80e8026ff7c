//! Task report persistence

use crate::models::{ReportStatus, TaskReport};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use strix_common::{Error, Result};
use uuid::Uuid;

/// Insert or replace the report for one task attempt
pub async fn save_report(pool: &SqlitePool, report: &TaskReport) -> Result<()> {
    let errors = serde_json::to_string(&report.errors)?;
    sqlx::query(
        r#"
        INSERT INTO task_reports (task_id, job_id, plugin, status, errors, start_time, end_time)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(task_id) DO UPDATE SET
            status = excluded.status,
            errors = excluded.errors,
            end_time = excluded.end_time
        "#,
    )
    .bind(report.task_id.to_string())
    .bind(report.job_id.to_string())
    .bind(&report.plugin)
    .bind(report.status.as_str())
    .bind(errors)
    .bind(report.start_time.to_rfc3339())
    .bind(report.end_time.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// All reports recorded for a job
pub async fn load_reports_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<Vec<TaskReport>> {
    let rows = sqlx::query(
        "SELECT task_id, job_id, plugin, status, errors, start_time, end_time FROM task_reports WHERE job_id = ? ORDER BY start_time",
    )
    .bind(job_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(report_from_row).collect()
}

fn report_from_row(row: sqlx::sqlite::SqliteRow) -> Result<TaskReport> {
    let task_id: String = row.get("task_id");
    let job_id: String = row.get("job_id");
    let status: String = row.get("status");
    let errors: String = row.get("errors");
    let start_time: String = row.get("start_time");
    let end_time: String = row.get("end_time");

    let parse_time = |s: &str| -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| Error::Internal(format!("bad timestamp: {e}")))?
            .with_timezone(&Utc))
    };

    Ok(TaskReport {
        task_id: Uuid::parse_str(&task_id)
            .map_err(|e| Error::Internal(format!("bad task id: {e}")))?,
        job_id: Uuid::parse_str(&job_id)
            .map_err(|e| Error::Internal(format!("bad job id: {e}")))?,
        plugin: row.get("plugin"),
        status: ReportStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown report status `{status}`")))?,
        errors: serde_json::from_str(&errors)?,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[tokio::test]
    async fn report_upsert_keeps_one_row_per_task() {
        let pool = init_memory().await.unwrap();
        let job_id = Uuid::new_v4();
        let mut report = TaskReport::new(Uuid::new_v4(), job_id, "Shodan");
        save_report(&pool, &report).await.unwrap();

        report.append_error("timeout");
        report.finish(ReportStatus::Failed);
        save_report(&pool, &report).await.unwrap();

        let reports = load_reports_for_job(&pool, job_id).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, ReportStatus::Failed);
        assert_eq!(reports[0].errors, ["timeout"]);
    }
}
