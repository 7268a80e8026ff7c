//! Job persistence

use crate::models::{Job, JobStatus};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use strix_common::{Error, Result};
use uuid::Uuid;

/// Insert a new job row
pub async fn save_job(pool: &SqlitePool, job: &Job) -> Result<()> {
    let runtime = serde_json::to_string(&job.runtime_configuration)?;
    sqlx::query(
        r#"
        INSERT INTO jobs (id, user_id, observable, observable_kind, status, runtime_configuration, received_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.id.to_string())
    .bind(job.user.map(|u| u.to_string()))
    .bind(&job.observable)
    .bind(&job.observable_kind)
    .bind(job.status.as_str())
    .bind(runtime)
    .bind(job.received_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist a status change; statuses are append-style, the row is otherwise
/// immutable after insert
pub async fn update_status(pool: &SqlitePool, job_id: Uuid, status: JobStatus) -> Result<()> {
    let result = sqlx::query("UPDATE jobs SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(job_id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("job {job_id}")));
    }
    Ok(())
}

/// Load one job by id
pub async fn load_job(pool: &SqlitePool, job_id: Uuid) -> Result<Option<Job>> {
    let row = sqlx::query(
        "SELECT id, user_id, observable, observable_kind, status, runtime_configuration, received_at FROM jobs WHERE id = ?",
    )
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(job_from_row).transpose()
}

fn job_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Job> {
    let id: String = row.get("id");
    let user_id: Option<String> = row.get("user_id");
    let status: String = row.get("status");
    let runtime: String = row.get("runtime_configuration");
    let received_at: String = row.get("received_at");

    Ok(Job {
        id: Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("bad job id: {e}")))?,
        user: user_id
            .map(|u| Uuid::parse_str(&u))
            .transpose()
            .map_err(|e| Error::Internal(format!("bad user id: {e}")))?,
        observable: row.get("observable"),
        observable_kind: row.get("observable_kind"),
        status: JobStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown job status `{status}`")))?,
        runtime_configuration: serde_json::from_str(&runtime)?,
        received_at: DateTime::parse_from_rfc3339(&received_at)
            .map_err(|e| Error::Internal(format!("bad received_at: {e}")))?
            .with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;
    use std::collections::HashMap;

    #[tokio::test]
    async fn job_round_trips() {
        let pool = init_memory().await.unwrap();
        let mut runtime = HashMap::new();
        runtime.insert(
            "AnalyzerX".to_string(),
            HashMap::from([("api_key_name".to_string(), serde_json::json!("abc"))]),
        );
        let job = Job::new("8.8.8.8", "ip", Some(Uuid::new_v4()))
            .with_runtime_configuration(runtime);

        save_job(&pool, &job).await.unwrap();
        let loaded = load_job(&pool, job.id).await.unwrap().expect("job exists");
        assert_eq!(loaded.observable, "8.8.8.8");
        assert_eq!(loaded.user, job.user);
        assert_eq!(
            loaded.runtime_value("AnalyzerX", "api_key_name"),
            Some(&serde_json::json!("abc"))
        );
        assert_eq!(loaded.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn status_update_persists() {
        let pool = init_memory().await.unwrap();
        let job = Job::new("8.8.8.8", "ip", None);
        save_job(&pool, &job).await.unwrap();

        update_status(&pool, job.id, JobStatus::AnalyzersRunning)
            .await
            .unwrap();
        let loaded = load_job(&pool, job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::AnalyzersRunning);
    }

    #[tokio::test]
    async fn updating_a_missing_job_is_not_found() {
        let pool = init_memory().await.unwrap();
        let err = update_status(&pool, Uuid::new_v4(), JobStatus::Failed).await;
        assert!(matches!(err, Err(Error::NotFound(_))));
    }
}
